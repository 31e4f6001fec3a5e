//! Server error types.

use std::io;
use thiserror::Error;

/// Result type for server operations.
pub type ServerResult<T> = Result<T, ServerError>;

/// Errors that can occur in the board server.
///
/// Transient cache write failures do NOT appear here: they are logged
/// inside the persistence scheduler and retried on the next debounce
/// cycle, never crashing the process or the mutation that caused them.
#[derive(Debug, Error)]
pub enum ServerError {
    /// The durable cache could not be opened or scanned.
    #[error("cache error: {0}")]
    Cache(#[from] boardsync_cache::CacheError),

    /// Core/board serialization error.
    #[error("core error: {0}")]
    Core(#[from] boardsync_core::CoreError),

    /// An acknowledgment payload could not be serialized.
    #[error("reply serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Transport I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}
