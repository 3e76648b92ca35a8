//! Spatial reservations for in-flight animations.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use tokio::time::sleep;

use crate::geometry::Rect;

/// Identifier of the slot worker owning a reservation.
pub type SlotId = usize;

/// Tracks the screen rectangles currently swept by in-flight animations.
///
/// This is bookkeeping over space, not a memory lock: contention is resolved
/// by polling at a configured retry delay rather than queueing, because
/// admission order does not matter. What matters is that no two reserved
/// regions, inflated by the buffer margin, ever overlap. Reservations carry
/// the post-scale-up bounding box, so simultaneously enlarging elements
/// cannot collide mid-animation.
#[derive(Debug)]
pub struct RegionLock {
    buffer_margin: f32,
    retry_delay: Duration,
    reserved: Mutex<HashMap<SlotId, Rect>>,
}

impl RegionLock {
    #[must_use]
    pub fn new(buffer_margin: f32, retry_delay: Duration) -> Self {
        Self {
            buffer_margin,
            retry_delay,
            reserved: Mutex::new(HashMap::new()),
        }
    }

    /// Register `rect` for `slot` if its inflated footprint is clear of
    /// every other reservation. Returns whether the reservation was taken.
    pub fn try_reserve(&self, slot: SlotId, rect: Rect) -> bool {
        let mut reserved = self.reserved.lock().expect("region lock poisoned");
        let inflated = rect.inflate(self.buffer_margin);
        let blocked = reserved
            .iter()
            .filter(|(owner, _)| **owner != slot)
            .any(|(_, held)| held.inflate(self.buffer_margin).overlaps(&inflated));
        if blocked {
            return false;
        }
        reserved.insert(slot, rect);
        true
    }

    /// Suspend until the rectangle can be reserved, polling at the
    /// configured retry delay.
    pub async fn reserve(&self, slot: SlotId, rect: Rect) {
        while !self.try_reserve(slot, rect) {
            sleep(self.retry_delay).await;
        }
    }

    /// Drop `slot`'s reservation. Idempotent when nothing is held.
    pub fn free(&self, slot: SlotId) -> bool {
        self.reserved
            .lock()
            .expect("region lock poisoned")
            .remove(&slot)
            .is_some()
    }

    /// Snapshot of all current reservations.
    #[must_use]
    pub fn reservations(&self) -> Vec<(SlotId, Rect)> {
        self.reserved
            .lock()
            .expect("region lock poisoned")
            .iter()
            .map(|(slot, rect)| (*slot, *rect))
            .collect()
    }

    #[must_use]
    pub fn retry_delay(&self) -> Duration {
        self.retry_delay
    }
}
