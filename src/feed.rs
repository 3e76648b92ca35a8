//! Wire framing of the gallery update feed.
//!
//! A standing subscription delivers one snapshot frame followed by
//! incremental changes. The JSON shapes mirror the upstream gallery
//! protocol: `{"images": [...]}` for the snapshot, `{"addition": {...}}`
//! for a single new item, `{"additions": [...], "deletions": [...]}` for
//! a batched delta.

use serde::{Deserialize, Serialize};

use crate::item::{Item, ItemId};

/// One event on the update feed. One frame maps to one tracker supply
/// call, whatever its shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FeedFrame {
    /// Full listing sent when the subscription opens.
    Snapshot { images: Vec<Item> },
    /// Single newly announced item.
    Addition { addition: Item },
    /// Batched additions and removals. `deletions` may be omitted on
    /// the wire.
    Delta {
        additions: Vec<Item>,
        #[serde(default)]
        deletions: Vec<ItemId>,
    },
}

impl FeedFrame {
    /// Flatten the frame into the `(additions, removals)` pair the
    /// tracker consumes.
    #[must_use]
    pub fn into_supply(self) -> (Vec<Item>, Vec<ItemId>) {
        match self {
            Self::Snapshot { images } => (images, Vec::new()),
            Self::Addition { addition } => (vec![addition], Vec::new()),
            Self::Delta {
                additions,
                deletions,
            } => (additions, deletions),
        }
    }

    /// Number of items the frame announces or retracts.
    #[must_use]
    pub fn change_count(&self) -> usize {
        match self {
            Self::Snapshot { images } => images.len(),
            Self::Addition { .. } => 1,
            Self::Delta {
                additions,
                deletions,
            } => additions.len() + deletions.len(),
        }
    }
}
