use std::fmt;
use std::time::SystemTime;

use serde::{Deserialize, Serialize};

/// Stable identifier of one media entry, opaque to the wall.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemId(pub String);

impl ItemId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ItemId {
    fn from(value: &str) -> Self {
        Self(value.to_owned())
    }
}

impl From<String> for ItemId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Media kind, decided once when an item is first observed. It selects the
/// fetch variant (preview still vs playable video) and the readiness check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MediaKind {
    Image,
    Video,
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Image => "image",
            Self::Video => "video",
        })
    }
}

/// One media entry as reported by a source.
///
/// Immutable once observed; only its membership in the tracker sets changes
/// afterwards. `width`/`height` are the natural, orientation-corrected pixel
/// dimensions used for aspect-locked sizing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Item {
    pub id: ItemId,
    pub kind: MediaKind,
    pub width: u32,
    pub height: u32,
    /// Creation instant upstream, kept so genuinely new content can be
    /// prioritized and logged on supply.
    #[serde(with = "humantime_serde", default = "SystemTime::now")]
    pub created_at: SystemTime,
}

impl Item {
    /// Natural width/height ratio, guarded against zero dimensions.
    #[must_use]
    pub fn aspect(&self) -> f32 {
        self.width.max(1) as f32 / self.height.max(1) as f32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn aspect_survives_zero_dimensions() {
        let item = Item {
            id: ItemId::from("x"),
            kind: MediaKind::Image,
            width: 0,
            height: 0,
            created_at: SystemTime::UNIX_EPOCH,
        };
        assert_eq!(item.aspect(), 1.0);
    }

    #[test]
    fn kind_serializes_kebab() {
        let json = serde_json::to_string(&MediaKind::Video).unwrap();
        assert_eq!(json, "\"video\"");
        let back: MediaKind = serde_json::from_str("\"image\"").unwrap();
        assert_eq!(back, MediaKind::Image);
    }
}
