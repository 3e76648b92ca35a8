//! Display handles over fetched media bytes.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// A locally-created, revocable reference to fetched media content.
///
/// Analogous to an object URL: it dereferences through the registry that
/// minted it for as long as it is live, and resolves to nothing once
/// released.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DisplayHandle(u64);

impl DisplayHandle {
    #[must_use]
    pub fn id(&self) -> u64 {
        self.0
    }
}

/// Mints display handles and guarantees each is invalidated at most once.
///
/// Every fetch binds exactly one handle, and every removal path routes
/// through [`release`]. Double release is a silent no-op because eviction
/// and error-path cleanup may race for the same element. The counters
/// exist so long-running use can be checked for balance.
///
/// [`release`]: HandleRegistry::release
#[derive(Debug, Default)]
pub struct HandleRegistry {
    state: Mutex<RegistryState>,
}

#[derive(Debug, Default)]
struct RegistryState {
    next: u64,
    live: HashMap<u64, Arc<[u8]>>,
    bound: u64,
    released: u64,
}

impl HandleRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create one dereferenceable handle for one fetch's bytes.
    pub fn bind(&self, bytes: Vec<u8>) -> DisplayHandle {
        let mut state = self.state.lock().expect("handle registry poisoned");
        let id = state.next;
        state.next += 1;
        state.bound += 1;
        state.live.insert(id, Arc::from(bytes.into_boxed_slice()));
        DisplayHandle(id)
    }

    /// Dereference a live handle.
    #[must_use]
    pub fn resolve(&self, handle: &DisplayHandle) -> Option<Arc<[u8]>> {
        self.state
            .lock()
            .expect("handle registry poisoned")
            .live
            .get(&handle.0)
            .cloned()
    }

    /// Invalidate a handle. Returns whether this call performed the
    /// release; a second release of the same handle does nothing.
    pub fn release(&self, handle: &DisplayHandle) -> bool {
        let mut state = self.state.lock().expect("handle registry poisoned");
        if state.live.remove(&handle.0).is_some() {
            state.released += 1;
            true
        } else {
            false
        }
    }

    /// Number of handles currently live.
    #[must_use]
    pub fn live(&self) -> usize {
        self.state.lock().expect("handle registry poisoned").live.len()
    }

    /// Handles ever bound.
    #[must_use]
    pub fn total_bound(&self) -> u64 {
        self.state.lock().expect("handle registry poisoned").bound
    }

    /// Handles ever released.
    #[must_use]
    pub fn total_released(&self) -> u64 {
        self.state.lock().expect("handle registry poisoned").released
    }
}
