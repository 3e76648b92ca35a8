use photo_wall::feed::FeedFrame;
use photo_wall::item::ItemId;
use photo_wall::tracker::AvailabilityTracker;

fn apply(tracker: &AvailabilityTracker, frame_json: &str) {
    let frame: FeedFrame = serde_json::from_str(frame_json).expect("frame did not parse");
    let (additions, removals) = frame.into_supply();
    tracker.supply(additions, &removals);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn update_transcript_drives_the_pool() {
    let tracker = AvailabilityTracker::new(Some(17));

    // Initial snapshot: two items, one of them without a timestamp.
    apply(
        &tracker,
        r#"{"images":[
            {"id":"alpha.jpg","kind":"image","width":1600,"height":900,"created-at":"2024-05-01T10:00:00Z"},
            {"id":"beta.mp4","kind":"video","width":1280,"height":720}
        ]}"#,
    );
    let snapshot = tracker.snapshot();
    assert_eq!(snapshot.pending.len(), 2);
    assert!(snapshot.pending.contains(&ItemId::from("alpha.jpg")));
    assert!(snapshot.pending.contains(&ItemId::from("beta.mp4")));

    // Combined delta: gamma arrives while alpha leaves the library.
    apply(
        &tracker,
        r#"{"additions":[{"id":"gamma.jpg","kind":"image","width":800,"height":600}],
            "deletions":["alpha.jpg"]}"#,
    );
    let snapshot = tracker.snapshot();
    assert_eq!(snapshot.pending.len(), 2);
    assert!(!snapshot.pending.contains(&ItemId::from("alpha.jpg")));
    assert!(snapshot.pending.contains(&ItemId::from("gamma.jpg")));

    // Additions-only delta omits the deletions key entirely.
    apply(
        &tracker,
        r#"{"additions":[{"id":"delta.png","kind":"image","width":640,"height":480}]}"#,
    );
    assert!(tracker
        .snapshot()
        .pending
        .contains(&ItemId::from("delta.png")));

    // Single-item shorthand used for fresh uploads.
    apply(
        &tracker,
        r#"{"addition":{"id":"epsilon.webp","kind":"image","width":320,"height":240}}"#,
    );
    let snapshot = tracker.snapshot();
    assert_eq!(snapshot.pending.len(), 4);
    assert!(snapshot.pending.contains(&ItemId::from("epsilon.webp")));
    assert!(snapshot.available.is_empty());
    assert!(snapshot.in_flight.is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn wire_removal_of_a_claimed_item_wins_over_its_release() {
    let tracker = AvailabilityTracker::new(Some(17));
    apply(
        &tracker,
        r#"{"addition":{"id":"fleeting.jpg","kind":"image","width":800,"height":600}}"#,
    );

    let claimed = tracker.acquire().await;
    assert_eq!(claimed.id, ItemId::from("fleeting.jpg"));

    // The library drops the item while a slot still holds it.
    apply(&tracker, r#"{"additions":[],"deletions":["fleeting.jpg"]}"#);
    assert_eq!(tracker.snapshot().known(), 0);

    // The slot's eventual hand-back must not resurrect the id.
    tracker.release(&claimed.id);
    assert_eq!(tracker.snapshot().known(), 0);

    // A later re-upload of the same id starts over as pending.
    apply(
        &tracker,
        r#"{"addition":{"id":"fleeting.jpg","kind":"image","width":800,"height":600}}"#,
    );
    let snapshot = tracker.snapshot();
    assert!(snapshot.pending.contains(&claimed.id));
    assert!(snapshot.available.is_empty());
}
