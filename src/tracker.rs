//! Shared rotation state: which media items are waiting, resting or on loan.
//!
//! Every id known to the tracker lives in exactly one of three sets:
//! `pending` (announced by the feed, not yet displayed), `available`
//! (resting on the wall, claimable again) or `in_flight` (on loan to a
//! slot). Slots park on [`AvailabilityTracker::acquire`] when nothing is
//! claimable and are woken one at a time as supply and release events
//! land.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use rand::rngs::StdRng;
use rand::seq::IndexedRandom;
use rand::{Rng, SeedableRng};
use tokio::sync::Notify;
use tracing::{debug, trace};

use crate::item::{Item, ItemId};

/// Point-in-time copy of the three tracking sets.
#[derive(Debug, Clone)]
pub struct TrackerSnapshot {
    pub pending: HashSet<ItemId>,
    pub available: HashSet<ItemId>,
    pub in_flight: HashSet<ItemId>,
}

impl TrackerSnapshot {
    /// Total ids known to the tracker.
    #[must_use]
    pub fn known(&self) -> usize {
        self.pending.len() + self.available.len() + self.in_flight.len()
    }
}

#[derive(Debug)]
struct TrackerState {
    pending: HashSet<ItemId>,
    available: HashSet<ItemId>,
    in_flight: HashSet<ItemId>,
    items: HashMap<ItemId, Item>,
    rng: StdRng,
}

/// Hands each claimable item to exactly one slot at a time.
///
/// The mutex is never held across an await; waiting happens on a
/// [`Notify`] in single-wake mode, so one supply or release event
/// releases at most one parked acquirer.
#[derive(Debug)]
pub struct AvailabilityTracker {
    state: Mutex<TrackerState>,
    wakeup: Notify,
}

impl AvailabilityTracker {
    /// `seed` pins the claim order for reproducible runs; `None` draws
    /// a fresh seed per session.
    #[must_use]
    pub fn new(seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::seed_from_u64(rand::rng().random()),
        };
        Self {
            state: Mutex::new(TrackerState {
                pending: HashSet::new(),
                available: HashSet::new(),
                in_flight: HashSet::new(),
                items: HashMap::new(),
                rng,
            }),
            wakeup: Notify::new(),
        }
    }

    /// Apply one feed event: unknown additions enter `pending`, removals
    /// leave whichever set holds them. An id removed while in flight
    /// finishes its current display; the eventual `release` of it is a
    /// no-op. Wakes at most one parked acquirer.
    pub fn supply(&self, additions: Vec<Item>, removals: &[ItemId]) {
        let claimable = {
            let mut state = self.state.lock().expect("tracker state poisoned");
            for id in removals {
                if state.items.remove(id).is_some() {
                    state.pending.remove(id);
                    state.available.remove(id);
                    state.in_flight.remove(id);
                    trace!(id = %id, "item removed from rotation");
                }
            }
            for item in additions {
                if state.items.contains_key(&item.id) {
                    continue;
                }
                debug!(
                    id = %item.id,
                    kind = %item.kind,
                    created = %humantime::format_rfc3339_seconds(item.created_at),
                    "item entered rotation"
                );
                state.pending.insert(item.id.clone());
                state.items.insert(item.id.clone(), item);
            }
            !state.pending.is_empty() || !state.available.is_empty()
        };
        if claimable {
            self.wakeup.notify_one();
        }
    }

    /// Claim one item for display, waiting as long as it takes.
    ///
    /// `pending` items win over `available` ones; inside a tier the pick
    /// is uniform under the session RNG. The returned item is in flight
    /// until [`release`] or [`discard`].
    ///
    /// Cancel safe: dropping the future before it resolves claims
    /// nothing, and a wakeup it consumed passes on to the next waiter.
    ///
    /// [`release`]: AvailabilityTracker::release
    /// [`discard`]: AvailabilityTracker::discard
    pub async fn acquire(&self) -> Item {
        loop {
            if let Some(item) = self.try_claim() {
                return item;
            }
            self.wakeup.notified().await;
        }
    }

    /// Single-lock-scope claim; `None` when nothing is claimable.
    fn try_claim(&self) -> Option<Item> {
        let mut guard = self.state.lock().expect("tracker state poisoned");
        let state = &mut *guard;
        let tier = if !state.pending.is_empty() {
            &mut state.pending
        } else if !state.available.is_empty() {
            &mut state.available
        } else {
            return None;
        };
        // Sorted ids keep the pick a pure function of the seed.
        let mut ids: Vec<&ItemId> = tier.iter().collect();
        ids.sort_unstable();
        let id = (*ids.as_slice().choose(&mut state.rng)?).clone();
        let item = state.items.get(&id).cloned()?;
        tier.remove(&id);
        state.in_flight.insert(id);
        Some(item)
    }

    /// Return a displayed item to the claimable pool. Silent no-op when
    /// the id was removed while on loan. Wakes at most one acquirer.
    pub fn release(&self, id: &ItemId) {
        let woke = {
            let mut state = self.state.lock().expect("tracker state poisoned");
            if state.in_flight.remove(id) {
                state.available.insert(id.clone());
                true
            } else {
                trace!(id = %id, "release of unknown or removed item ignored");
                false
            }
        };
        if woke {
            self.wakeup.notify_one();
        }
    }

    /// Drop an in-flight id from tracking entirely. Used when its bytes
    /// turn out to be undecodable; the item never re-enters rotation.
    pub fn discard(&self, id: &ItemId) {
        let mut state = self.state.lock().expect("tracker state poisoned");
        state.pending.remove(id);
        state.available.remove(id);
        state.in_flight.remove(id);
        if state.items.remove(id).is_some() {
            debug!(id = %id, "item discarded from rotation");
        }
    }

    #[must_use]
    pub fn snapshot(&self) -> TrackerSnapshot {
        let state = self.state.lock().expect("tracker state poisoned");
        TrackerSnapshot {
            pending: state.pending.clone(),
            available: state.available.clone(),
            in_flight: state.in_flight.clone(),
        }
    }
}
