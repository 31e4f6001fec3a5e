//! The board server: store, rooms and persistence wired together.

use crate::config::ServerConfig;
use crate::error::ServerResult;
use crate::rooms::{ConnectionId, RoomRegistry};
use crate::saver::SaveScheduler;
use crate::session::{Session, SessionContext};
use boardsync_cache::CacheStore;
use boardsync_core::{Board, BoardId, BoardStore};
use boardsync_protocol::ServerEvent;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedSender;
use tracing::{info, warn};

/// Cache key of a board: `<prefix>board-<boardId>`.
#[must_use]
pub fn board_key(prefix: &str, board: BoardId) -> String {
    format!("{prefix}board-{board}")
}

/// The board synchronization server.
///
/// Constructed once at process start: opens the durable cache when one
/// is configured, rehydrates the board store from it, and starts the
/// persistence scheduler. Connections are attached with
/// [`connect`](Self::connect) and detached by dropping their session.
pub struct BoardServer {
    config: ServerConfig,
    context: Arc<SessionContext>,
    next_connection: AtomicU64,
}

impl BoardServer {
    /// Creates a server, opening the cache named by the configuration.
    pub fn new(config: ServerConfig) -> ServerResult<Self> {
        let cache = match &config.cache_url {
            Some(url) => {
                info!(
                    url,
                    prefix = config.cache_prefix,
                    ttl_sec = config.cache_ttl.as_secs(),
                    "opening durable cache"
                );
                Some(boardsync_cache::open(url)?)
            }
            None => {
                info!("no cache configured; running in-memory only");
                None
            }
        };
        Self::with_cache(config, cache)
    }

    /// Creates a server around an already-open cache (or none).
    pub fn with_cache(
        config: ServerConfig,
        cache: Option<Arc<dyn CacheStore>>,
    ) -> ServerResult<Self> {
        let store = Arc::new(BoardStore::new());
        let saver = match cache {
            Some(cache) => {
                rehydrate(&store, cache.as_ref(), &config.cache_prefix)?;
                SaveScheduler::new(
                    Arc::clone(&store),
                    cache,
                    config.cache_prefix.clone(),
                    config.cache_ttl,
                    config.save_debounce,
                )
            }
            None => SaveScheduler::disabled(),
        };
        let context = Arc::new(SessionContext {
            store,
            rooms: RoomRegistry::new(),
            saver,
        });
        Ok(Self {
            config,
            context,
            next_connection: AtomicU64::new(1),
        })
    }

    /// Returns the server configuration.
    #[must_use]
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Returns the shared board store.
    #[must_use]
    pub fn store(&self) -> &Arc<BoardStore> {
        &self.context.store
    }

    /// Attaches a new connection, binding it to `board_id` when given.
    pub fn connect(
        &self,
        board_id: Option<BoardId>,
        sender: UnboundedSender<ServerEvent>,
    ) -> Session {
        let connection = ConnectionId::new(self.next_connection.fetch_add(1, Ordering::Relaxed));
        Session::bind(Arc::clone(&self.context), connection, board_id, sender)
    }

    /// Flushes every pending save. Called on shutdown.
    pub fn close(&self) -> ServerResult<()> {
        self.context.saver.flush()
    }
}

/// Repopulates the store from the cache's board entries. Entries that
/// fail to parse are logged and skipped.
fn rehydrate(store: &BoardStore, cache: &dyn CacheStore, prefix: &str) -> ServerResult<()> {
    let scan_prefix = format!("{prefix}board-");
    let mut loaded = 0usize;
    for (key, json) in cache.scan_prefix(&scan_prefix)? {
        match Board::from_json(&json) {
            Ok(board) => {
                store.insert(board);
                loaded += 1;
            }
            Err(err) => warn!(key, %err, "skipping unparseable cached board"),
        }
    }
    info!(boards = loaded, "rehydrated board store");
    Ok(())
}
