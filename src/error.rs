use thiserror::Error;

/// Library error type for wall operations.
#[derive(Debug, Error)]
pub enum Error {
    /// The insertion band reaches the viewport edges, so "insert near the
    /// center" no longer constrains anything.
    #[error("placement.insertion-band {0} must be below 0.5")]
    InsertionBandTooWide(f32),

    /// The standing update feed ended; the wall must not keep rendering
    /// against a feed it no longer trusts.
    #[error("update feed lost: {0}")]
    FeedLost(String),

    /// Underlying IO error.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// YAML/serde configuration error.
    #[error(transparent)]
    Config(#[from] serde_yaml::Error),
}
