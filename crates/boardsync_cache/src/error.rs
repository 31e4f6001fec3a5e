//! Cache error types.

use std::io;
use thiserror::Error;

/// Result type for cache operations.
pub type CacheResult<T> = Result<T, CacheError>;

/// Errors that can occur in cache operations.
#[derive(Debug, Error)]
pub enum CacheError {
    /// I/O error from the file-backed store.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Entry metadata could not be serialized or deserialized.
    #[error("entry serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The connection URL names no known backend.
    #[error("unsupported cache URL: {url}")]
    UnsupportedUrl {
        /// The rejected URL.
        url: String,
    },
}

impl CacheError {
    /// Creates an unsupported URL error.
    pub fn unsupported_url(url: impl Into<String>) -> Self {
        Self::UnsupportedUrl { url: url.into() }
    }
}
