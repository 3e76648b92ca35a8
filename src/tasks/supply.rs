//! Feed listener tasks keeping the tracker supplied.
//!
//! Two shapes, one per source mode: `run_push` holds a standing
//! subscription open and treats its loss as fatal, `run_poll` re-lists
//! the gallery on an interval and shrugs off transient failures. Both
//! funnel one feed event into one tracker supply call.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use crate::error::Error;
use crate::item::ItemId;
use crate::source::MediaSource;
use crate::surface::DisplaySurface;
use crate::tracker::AvailabilityTracker;

/// Drive the tracker from a standing subscription. The subscription
/// closing mid-session is unrecoverable: the wall shows a blocking
/// error banner and this task returns the feed error.
#[instrument(skip_all)]
pub async fn run_push<S: MediaSource>(
    source: Arc<S>,
    tracker: Arc<AvailabilityTracker>,
    surface: Arc<DisplaySurface>,
    cancel: CancellationToken,
) -> Result<()> {
    let mut frames = source
        .subscribe()
        .await
        .context("feed subscription failed")?;
    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                info!("cancel received; exiting supply task");
                return Ok(());
            }
            frame = frames.recv() => match frame {
                Some(frame) => {
                    debug!(changes = frame.change_count(), "feed frame received");
                    let (additions, removals) = frame.into_supply();
                    tracker.supply(additions, &removals);
                }
                None => {
                    surface.set_error_banner("update feed lost");
                    return Err(Error::FeedLost("subscription closed".into()).into());
                }
            }
        }
    }
}

/// Drive the tracker by re-listing the gallery every `interval`.
/// Listings are diffed against the ids already seen; only additions are
/// ever synthesized, one supply call per new item. A failed listing is
/// logged and retried on the next tick.
#[instrument(skip_all)]
pub async fn run_poll<S: MediaSource>(
    source: Arc<S>,
    tracker: Arc<AvailabilityTracker>,
    interval: Duration,
    cancel: CancellationToken,
) -> Result<()> {
    let mut known: HashSet<ItemId> = HashSet::new();
    loop {
        match source.list_once().await {
            Ok(listing) => {
                for item in listing {
                    if known.insert(item.id.clone()) {
                        tracker.supply(vec![item], &[]);
                    }
                }
            }
            Err(err) => warn!("gallery listing failed, retrying next tick: {err}"),
        }
        tokio::select! {
            _ = cancel.cancelled() => {
                info!("cancel received; exiting supply task");
                return Ok(());
            }
            _ = tokio::time::sleep(interval) => {}
        }
    }
}
