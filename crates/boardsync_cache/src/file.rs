//! File-backed cache store.
//!
//! One JSON file per entry under a directory. The entry carries its
//! own key and absolute expiry, so file names only need to be unique:
//! keys are sanitized to a filesystem-safe form and scans read the
//! stored key back out of each file.

use crate::error::CacheResult;
use crate::CacheStore;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tracing::debug;

const ENTRY_SUFFIX: &str = ".entry.json";

#[derive(Serialize, Deserialize)]
struct Entry {
    key: String,
    expires_at_ms: u64,
    value: String,
}

impl Entry {
    fn is_expired(&self, now_ms: u64) -> bool {
        now_ms >= self.expires_at_ms
    }
}

/// A cache store keeping one file per entry.
pub struct FileCache {
    dir: PathBuf,
}

impl FileCache {
    /// Opens (and creates if needed) a cache directory.
    pub fn open(dir: impl AsRef<Path>) -> CacheResult<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    /// Returns the cache directory.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn entry_path(&self, key: &str) -> PathBuf {
        let safe: String = key
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.' {
                    c
                } else {
                    '_'
                }
            })
            .collect();
        self.dir.join(format!("{safe}{ENTRY_SUFFIX}"))
    }

    fn read_entry(&self, path: &Path) -> Option<Entry> {
        let raw = fs::read_to_string(path).ok()?;
        match serde_json::from_str::<Entry>(&raw) {
            Ok(entry) => Some(entry),
            Err(err) => {
                debug!(path = %path.display(), %err, "skipping unreadable cache entry");
                None
            }
        }
    }
}

impl CacheStore for FileCache {
    fn put(&self, key: &str, value: &str, ttl: Duration) -> CacheResult<()> {
        let entry = Entry {
            key: key.to_string(),
            expires_at_ms: now_millis() + ttl.as_millis() as u64,
            value: value.to_string(),
        };
        let path = self.entry_path(key);
        let tmp = path.with_extension("tmp");
        fs::write(&tmp, serde_json::to_string(&entry)?)?;
        fs::rename(&tmp, &path)?;
        Ok(())
    }

    fn get(&self, key: &str) -> CacheResult<Option<String>> {
        let path = self.entry_path(key);
        let Some(entry) = self.read_entry(&path) else {
            return Ok(None);
        };
        if entry.key != key {
            return Ok(None);
        }
        if entry.is_expired(now_millis()) {
            let _ = fs::remove_file(&path);
            return Ok(None);
        }
        Ok(Some(entry.value))
    }

    fn scan_prefix(&self, prefix: &str) -> CacheResult<Vec<(String, String)>> {
        let now = now_millis();
        let mut hits = Vec::new();
        for item in fs::read_dir(&self.dir)? {
            let path = item?.path();
            if path
                .file_name()
                .and_then(|n| n.to_str())
                .is_none_or(|n| !n.ends_with(ENTRY_SUFFIX))
            {
                continue;
            }
            let Some(entry) = self.read_entry(&path) else {
                continue;
            };
            if entry.is_expired(now) {
                let _ = fs::remove_file(&path);
                continue;
            }
            if entry.key.starts_with(prefix) {
                hits.push((entry.key, entry.value));
            }
        }
        Ok(hits)
    }
}

/// Milliseconds since the Unix epoch.
fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
