//! In-memory cache store.

use crate::error::CacheResult;
use crate::CacheStore;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::time::{Duration, SystemTime};

struct Entry {
    value: String,
    expires_at: SystemTime,
}

impl Entry {
    fn is_expired(&self, now: SystemTime) -> bool {
        now >= self.expires_at
    }
}

/// A process-local cache store.
///
/// Expired entries are dropped lazily when read or scanned.
pub struct MemoryCache {
    entries: Mutex<HashMap<String, Entry>>,
}

impl MemoryCache {
    /// Creates an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Returns the number of entries, including not-yet-collected
    /// expired ones.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    /// Returns `true` if the cache holds no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for MemoryCache {
    fn default() -> Self {
        Self::new()
    }
}

impl CacheStore for MemoryCache {
    fn put(&self, key: &str, value: &str, ttl: Duration) -> CacheResult<()> {
        let entry = Entry {
            value: value.to_string(),
            expires_at: SystemTime::now() + ttl,
        };
        self.entries.lock().insert(key.to_string(), entry);
        Ok(())
    }

    fn get(&self, key: &str) -> CacheResult<Option<String>> {
        let now = SystemTime::now();
        let mut entries = self.entries.lock();
        match entries.get(key) {
            Some(entry) if entry.is_expired(now) => {
                entries.remove(key);
                Ok(None)
            }
            Some(entry) => Ok(Some(entry.value.clone())),
            None => Ok(None),
        }
    }

    fn scan_prefix(&self, prefix: &str) -> CacheResult<Vec<(String, String)>> {
        let now = SystemTime::now();
        let mut entries = self.entries.lock();
        entries.retain(|_, entry| !entry.is_expired(now));
        Ok(entries
            .iter()
            .filter(|(key, _)| key.starts_with(prefix))
            .map(|(key, entry)| (key.clone(), entry.value.clone()))
            .collect())
    }
}
