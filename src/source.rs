//! Contract between the wall and whatever supplies its media.

use std::future::Future;

use thiserror::Error;
use tokio::sync::mpsc;

use crate::feed::FeedFrame;
use crate::item::{Item, MediaKind};

/// Listing or subscription failure.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("media library unavailable: {0}")]
    Io(#[from] std::io::Error),
    #[error("library watcher failed: {0}")]
    Watch(#[from] notify::Error),
}

/// Per-attempt retrieval failure. The two variants drive opposite
/// recovery policies, so the caller must not collapse them.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Retrieval itself failed; the item is assumed intact and stays in
    /// rotation for a later attempt.
    #[error("media transport failed: {0}")]
    Transport(#[from] std::io::Error),
    /// Bytes arrived but are not displayable; the item leaves rotation
    /// for good.
    #[error("media payload undecodable: {0}")]
    Corrupt(String),
}

/// A gallery the wall can list, watch and fetch from.
///
/// Consumed through generics; the `Send` bounds on the returned futures
/// let callers drive a source from spawned tasks. Implementations write
/// plain `async fn` bodies.
pub trait MediaSource: Send + Sync + 'static {
    /// One full listing of the gallery. Pull-style supply diffs
    /// successive listings; removals are never synthesized from them.
    fn list_once(&self) -> impl Future<Output = Result<Vec<Item>, SourceError>> + Send;

    /// Standing subscription: one snapshot frame, then incremental
    /// deltas. The channel closing means the feed is lost for the rest
    /// of the session.
    fn subscribe(
        &self,
    ) -> impl Future<Output = Result<mpsc::Receiver<FeedFrame>, SourceError>> + Send;

    /// Retrieve displayable bytes for one item, routed by its kind
    /// (preview-quality still vs playable video). One report per
    /// attempt; retry policy belongs to the caller.
    fn fetch(&self, item: &Item) -> impl Future<Output = Result<Vec<u8>, FetchError>> + Send;
}

/// Kind-dispatched readiness check on fetched bytes: images must decode,
/// a video is ready as soon as its payload arrives.
pub fn ensure_displayable(kind: MediaKind, bytes: &[u8]) -> Result<(), FetchError> {
    match kind {
        MediaKind::Image => match image::load_from_memory(bytes) {
            Ok(_) => Ok(()),
            Err(err) => Err(FetchError::Corrupt(err.to_string())),
        },
        MediaKind::Video => {
            if bytes.is_empty() {
                Err(FetchError::Corrupt("empty video payload".into()))
            } else {
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn undecodable_image_bytes_are_corrupt() {
        let err = ensure_displayable(MediaKind::Image, b"not an image").unwrap_err();
        assert!(matches!(err, FetchError::Corrupt(_)));
    }

    #[test]
    fn video_bytes_are_ready_on_arrival() {
        assert!(ensure_displayable(MediaKind::Video, &[0, 1, 2, 3]).is_ok());
    }

    #[test]
    fn valid_png_passes_the_decode_gate() {
        let image = image::RgbaImage::from_pixel(4, 4, image::Rgba([10, 20, 30, 255]));
        let mut bytes = Vec::new();
        image
            .write_to(
                &mut std::io::Cursor::new(&mut bytes),
                image::ImageFormat::Png,
            )
            .unwrap();
        assert!(ensure_displayable(MediaKind::Image, &bytes).is_ok());
    }
}
