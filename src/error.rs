//! Error taxonomy for preview resolution and feature extraction.
//!
//! Everything in [`ResolveError`] is recoverable at the orchestration
//! level: a failed candidate is skipped, a failed seed yields an empty
//! recommendation list.  Nothing here should abort a recommendation call.

use thiserror::Error;

/// A recoverable failure while resolving a track's preview or features.
#[derive(Debug, Error)]
pub enum ResolveError {
    /// The catalog search returned no usable results.
    #[error("no search results for \"{0}\"")]
    NoMatch(String),

    /// The track detail carried neither a preview link nor a media preview.
    #[error("no preview url for track {0}")]
    NoPreviewUrl(String),

    /// The preview download answered with a non-success status.
    #[error("preview download failed with HTTP status {0}")]
    DownloadStatus(u16),

    /// Transport-level HTTP failure (connect, timeout, TLS, ...).
    #[error("http request failed: {0}")]
    Http(#[from] Box<ureq::Error>),

    /// The catalog answered with JSON we could not interpret.
    #[error("malformed catalog response: {0}")]
    BadResponse(String),

    /// The audio clip could not be decoded.
    #[error("audio decode failed: {0}")]
    Decode(String),

    /// Extraction produced NaN or infinite values.
    #[error("non-finite feature values from {0}")]
    NonFinite(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<ureq::Error> for ResolveError {
    fn from(e: ureq::Error) -> Self {
        ResolveError::Http(Box::new(e))
    }
}
