//! Server configuration.

use std::net::SocketAddr;
use std::time::Duration;

/// Default listen port.
pub const DEFAULT_PORT: u16 = 3000;
/// Default cache key prefix.
pub const DEFAULT_CACHE_PREFIX: &str = "whiteboard-";
/// Default cache TTL: 30 days, reset on every write.
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(30 * 24 * 60 * 60);
/// Default save debounce delay.
pub const DEFAULT_SAVE_DEBOUNCE: Duration = Duration::from_secs(3);

/// Configuration for the board server.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to bind to.
    pub bind_addr: SocketAddr,
    /// Durable cache connection URL. `None` disables persistence
    /// entirely; in-memory-only operation is first-class.
    pub cache_url: Option<String>,
    /// Cache key prefix.
    pub cache_prefix: String,
    /// Sliding expiry applied on every cache write.
    pub cache_ttl: Duration,
    /// Debounce delay coalescing mutation bursts into one write.
    pub save_debounce: Duration,
}

impl ServerConfig {
    /// Creates a configuration with defaults for everything but the
    /// bind address.
    pub fn new(bind_addr: SocketAddr) -> Self {
        Self {
            bind_addr,
            cache_url: None,
            cache_prefix: DEFAULT_CACHE_PREFIX.to_string(),
            cache_ttl: DEFAULT_CACHE_TTL,
            save_debounce: DEFAULT_SAVE_DEBOUNCE,
        }
    }

    /// Reads configuration from the environment.
    ///
    /// Recognized variables: `PORT`, `CACHE_URL`, `CACHE_PREFIX`,
    /// `CACHE_TTL_SEC`. Unset or unparseable values fall back to the
    /// defaults.
    pub fn from_env() -> Self {
        let port = std::env::var("PORT")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(DEFAULT_PORT);
        let mut config = Self::new(SocketAddr::from(([0, 0, 0, 0], port)));

        config.cache_url = std::env::var("CACHE_URL").ok();
        if let Ok(prefix) = std::env::var("CACHE_PREFIX") {
            config.cache_prefix = prefix;
        }
        if let Some(ttl) = std::env::var("CACHE_TTL_SEC")
            .ok()
            .and_then(|s| s.parse().ok())
        {
            config.cache_ttl = Duration::from_secs(ttl);
        }
        config
    }

    /// Sets the cache connection URL.
    pub fn with_cache_url(mut self, url: impl Into<String>) -> Self {
        self.cache_url = Some(url.into());
        self
    }

    /// Sets the cache key prefix.
    pub fn with_cache_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.cache_prefix = prefix.into();
        self
    }

    /// Sets the sliding cache TTL.
    pub fn with_cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl = ttl;
        self
    }

    /// Sets the save debounce delay.
    pub fn with_save_debounce(mut self, debounce: Duration) -> Self {
        self.save_debounce = debounce;
        self
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self::new(SocketAddr::from(([127, 0, 0, 1], DEFAULT_PORT)))
    }
}
