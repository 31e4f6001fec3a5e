//! # boardsync durable cache
//!
//! A small key/value store with per-entry expiry, used to mirror board
//! state across process restarts. Two implementations are provided and
//! selected by a connection URL:
//!
//! - `memory:` is process-local, mainly for tests and ephemeral setups
//! - `file://<dir>` keeps one file per entry under a directory
//!
//! Absence of a URL disables persistence entirely; in-memory-only
//! operation is first-class, not degraded.

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod error;
mod file;
mod memory;

pub use error::{CacheError, CacheResult};
pub use file::FileCache;
pub use memory::MemoryCache;

use std::sync::Arc;
use std::time::Duration;

/// A key/value store with sliding per-entry expiry.
///
/// Implementations must treat expired entries as absent on both
/// [`get`](CacheStore::get) and [`scan_prefix`](CacheStore::scan_prefix).
pub trait CacheStore: Send + Sync {
    /// Stores `value` under `key`, replacing any previous entry and
    /// resetting its expiry to `ttl` from now.
    fn put(&self, key: &str, value: &str, ttl: Duration) -> CacheResult<()>;

    /// Returns the live value under `key`, if any.
    fn get(&self, key: &str) -> CacheResult<Option<String>>;

    /// Returns all live `(key, value)` entries whose key starts with
    /// `prefix`.
    fn scan_prefix(&self, prefix: &str) -> CacheResult<Vec<(String, String)>>;
}

/// Opens a cache store from a connection URL.
pub fn open(url: &str) -> CacheResult<Arc<dyn CacheStore>> {
    if url == "memory:" || url == "memory://" {
        return Ok(Arc::new(MemoryCache::new()));
    }
    if let Some(dir) = url.strip_prefix("file://") {
        return Ok(Arc::new(FileCache::open(dir)?));
    }
    Err(CacheError::unsupported_url(url))
}
