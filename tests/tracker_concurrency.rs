use photo_wall::item::{Item, ItemId, MediaKind};
use photo_wall::tracker::AvailabilityTracker;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::SystemTime;
use tokio::sync::mpsc;

fn item(id: &str) -> Item {
    Item {
        id: ItemId::from(id),
        kind: MediaKind::Image,
        width: 800,
        height: 200,
        created_at: SystemTime::now(),
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn burst_of_acquirers_never_double_claims() {
    let tracker = Arc::new(AvailabilityTracker::new(Some(7)));
    let additions: Vec<Item> = (0..40).map(|n| item(&format!("item-{n:03}"))).collect();
    tracker.supply(additions, &[]);

    // Eight tasks race for five claims each; every claim must be unique.
    let mut handles = Vec::new();
    for _ in 0..8 {
        let tracker = Arc::clone(&tracker);
        handles.push(tokio::spawn(async move {
            let mut claimed = Vec::new();
            for _ in 0..5 {
                claimed.push(tracker.acquire().await.id);
            }
            claimed
        }));
    }

    let mut all: Vec<ItemId> = Vec::new();
    for handle in handles {
        all.extend(handle.await.expect("acquirer task panicked"));
    }

    assert_eq!(all.len(), 40);
    let unique: HashSet<&ItemId> = all.iter().collect();
    assert_eq!(unique.len(), 40, "some item was claimed by two tasks");

    let snapshot = tracker.snapshot();
    assert!(snapshot.pending.is_empty());
    assert!(snapshot.available.is_empty());
    assert_eq!(snapshot.in_flight.len(), 40);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn parked_acquirers_drain_one_per_supply_event() {
    let tracker = Arc::new(AvailabilityTracker::new(Some(11)));
    let (tx, mut rx) = mpsc::channel::<ItemId>(8);

    // Four acquirers park on an empty tracker.
    let mut handles = Vec::new();
    for _ in 0..4 {
        let tracker = Arc::clone(&tracker);
        let tx = tx.clone();
        handles.push(tokio::spawn(async move {
            let claimed = tracker.acquire().await;
            tx.send(claimed.id).await.expect("test channel closed");
        }));
    }
    drop(tx);
    tokio::time::sleep(std::time::Duration::from_millis(100)).await;

    // Two single-item supply events wake exactly two of them.
    tracker.supply(vec![item("first")], &[]);
    tracker.supply(vec![item("second")], &[]);

    let mut drained: HashSet<ItemId> = HashSet::new();
    for _ in 0..2 {
        let id = tokio::time::timeout(std::time::Duration::from_secs(2), rx.recv())
            .await
            .expect("timeout waiting for a woken acquirer")
            .expect("test channel closed");
        drained.insert(id);
    }
    assert_eq!(
        drained,
        HashSet::from([ItemId::from("first"), ItemId::from("second")])
    );

    // The other two stay parked until more items show up.
    let none = tokio::time::timeout(std::time::Duration::from_millis(300), rx.recv()).await;
    assert!(none.is_err(), "a third acquirer proceeded without an item");

    tracker.supply(vec![item("third")], &[]);
    tracker.supply(vec![item("fourth")], &[]);
    for _ in 0..2 {
        tokio::time::timeout(std::time::Duration::from_secs(2), rx.recv())
            .await
            .expect("timeout waiting for the late acquirers")
            .expect("test channel closed");
    }
    for handle in handles {
        handle.await.expect("acquirer task panicked");
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn sets_stay_disjoint_under_mixed_traffic() {
    let tracker = Arc::new(AvailabilityTracker::new(Some(3)));
    tracker.supply((0..12).map(|n| item(&format!("seed-{n}"))).collect(), &[]);

    let mut workers = Vec::new();
    for _ in 0..4 {
        let tracker = Arc::clone(&tracker);
        workers.push(tokio::spawn(async move {
            for _ in 0..30 {
                let claimed = tracker.acquire().await;
                tokio::time::sleep(std::time::Duration::from_millis(1)).await;
                tracker.release(&claimed.id);
            }
        }));
    }

    // Feed and shrink the pool while the workers churn.
    for n in 0..20 {
        tracker.supply(vec![item(&format!("live-{n}"))], &[]);
        if n % 5 == 0 {
            tracker.supply(Vec::new(), &[ItemId::from(format!("seed-{n}"))]);
        }
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
    }

    for worker in workers {
        worker.await.expect("worker task panicked");
    }

    let snapshot = tracker.snapshot();
    assert!(
        snapshot.pending.is_disjoint(&snapshot.available),
        "an id sits in both pending and available"
    );
    assert!(
        snapshot.pending.is_disjoint(&snapshot.in_flight),
        "an id sits in both pending and in-flight"
    );
    assert!(
        snapshot.available.is_disjoint(&snapshot.in_flight),
        "an id sits in both available and in-flight"
    );
    assert!(snapshot.in_flight.is_empty(), "every claim was released");
    for n in [0, 5, 10, 15] {
        let removed = ItemId::from(format!("seed-{n}"));
        assert!(!snapshot.pending.contains(&removed));
        assert!(!snapshot.available.contains(&removed));
    }
}
