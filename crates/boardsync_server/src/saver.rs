//! Debounced persistence of board state to the durable cache.
//!
//! Each board is either Idle or Pending. `request_save` arms a timer
//! on the Idle-to-Pending transition and is a no-op while Pending, so
//! at most one timer is in flight per board. When the timer fires the
//! board transitions back to Idle and its CURRENT store state is
//! written, so a pending save always picks up everything that happened
//! after it was requested.

use crate::error::ServerResult;
use boardsync_cache::CacheStore;
use boardsync_core::{BoardId, BoardStore};
use std::collections::{HashSet, VecDeque};
use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

enum Command {
    Save(BoardId),
    Flush(Sender<()>),
    Shutdown,
}

/// Schedules debounced cache writes on a dedicated worker thread.
///
/// `request_save` is a channel send and never blocks the caller on
/// cache I/O. Write failures are logged and dropped; the board stays
/// valid in memory and any later mutation re-arms a save.
pub struct SaveScheduler {
    tx: Option<Sender<Command>>,
    worker: Option<JoinHandle<()>>,
}

impl SaveScheduler {
    /// Creates a scheduler mirroring `store` into `cache`.
    ///
    /// Keys are `<prefix>board-<boardId>`; `ttl` is reapplied on every
    /// write, so an actively edited board never expires.
    pub fn new(
        store: Arc<BoardStore>,
        cache: Arc<dyn CacheStore>,
        prefix: String,
        ttl: Duration,
        debounce: Duration,
    ) -> Self {
        let (tx, rx) = mpsc::channel();
        let spawned = std::thread::Builder::new()
            .name("boardsync-saver".into())
            .spawn(move || {
                let mut worker = Worker {
                    store,
                    cache,
                    prefix,
                    ttl,
                    debounce,
                    queue: VecDeque::new(),
                    pending: HashSet::new(),
                };
                worker.run(&rx);
            });
        match spawned {
            Ok(worker) => Self {
                tx: Some(tx),
                worker: Some(worker),
            },
            Err(err) => {
                warn!(%err, "failed to start the persistence worker; persistence is disabled");
                Self {
                    tx: None,
                    worker: None,
                }
            }
        }
    }

    /// Creates a no-op scheduler for cache-less operation.
    #[must_use]
    pub fn disabled() -> Self {
        Self {
            tx: None,
            worker: None,
        }
    }

    /// Returns `true` if persistence is active.
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.tx.is_some()
    }

    /// Requests a debounced save of the board. No-op while a save for
    /// this board is already pending, and when persistence is off.
    pub fn request_save(&self, board: BoardId) {
        if let Some(tx) = &self.tx {
            let _ = tx.send(Command::Save(board));
        }
    }

    /// Forces every pending save to run now and waits for completion.
    pub fn flush(&self) -> ServerResult<()> {
        if let Some(tx) = &self.tx {
            let (ack_tx, ack_rx) = mpsc::channel();
            if tx.send(Command::Flush(ack_tx)).is_ok() {
                let _ = ack_rx.recv();
            }
        }
        Ok(())
    }
}

impl Drop for SaveScheduler {
    fn drop(&mut self) {
        if let Some(tx) = self.tx.take() {
            let _ = tx.send(Command::Shutdown);
        }
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}

struct Worker {
    store: Arc<BoardStore>,
    cache: Arc<dyn CacheStore>,
    prefix: String,
    ttl: Duration,
    debounce: Duration,
    /// FIFO of armed timers; deadlines are monotonically increasing
    /// because every entry is armed `debounce` from now.
    queue: VecDeque<(BoardId, Instant)>,
    pending: HashSet<BoardId>,
}

impl Worker {
    fn run(&mut self, rx: &mpsc::Receiver<Command>) {
        loop {
            let command = match self.queue.front() {
                Some((_, due)) => {
                    let timeout = due.saturating_duration_since(Instant::now());
                    match rx.recv_timeout(timeout) {
                        Ok(command) => Some(command),
                        Err(RecvTimeoutError::Timeout) => None,
                        Err(RecvTimeoutError::Disconnected) => {
                            self.drain();
                            return;
                        }
                    }
                }
                None => match rx.recv() {
                    Ok(command) => Some(command),
                    Err(_) => return,
                },
            };

            match command {
                Some(Command::Save(board)) => {
                    if self.pending.insert(board) {
                        self.queue.push_back((board, Instant::now() + self.debounce));
                    }
                }
                Some(Command::Flush(ack)) => {
                    self.drain();
                    let _ = ack.send(());
                }
                Some(Command::Shutdown) => {
                    self.drain();
                    return;
                }
                None => self.fire_due(),
            }
        }
    }

    /// Fires every timer whose deadline has passed.
    fn fire_due(&mut self) {
        let now = Instant::now();
        while let Some((board, due)) = self.queue.front().copied() {
            if due > now {
                break;
            }
            self.queue.pop_front();
            self.pending.remove(&board);
            self.write(board);
        }
    }

    /// Fires every pending timer immediately.
    fn drain(&mut self) {
        while let Some((board, _)) = self.queue.pop_front() {
            self.pending.remove(&board);
            self.write(board);
        }
    }

    /// Writes the board's CURRENT state, read from the store at fire
    /// time.
    fn write(&self, board: BoardId) {
        let Some(snapshot) = self.store.get(board) else {
            return;
        };
        let json = match snapshot.to_json() {
            Ok(json) => json,
            Err(err) => {
                warn!(%board, %err, "failed to serialize board for persistence");
                return;
            }
        };
        let key = crate::server::board_key(&self.prefix, board);
        match self.cache.put(&key, &json, self.ttl) {
            Ok(()) => debug!(%board, "saved board"),
            Err(err) => warn!(%board, %err, "cache write failed; will retry on next mutation"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use boardsync_cache::MemoryCache;
    use boardsync_core::{Board, Line, LineMode};
    use std::thread;

    fn line(id: u64) -> Line {
        Line {
            id,
            x0: 0.0,
            y0: 0.0,
            x1: 1.0,
            y1: 1.0,
            color: "#000".into(),
            width: 1.0,
            mode: LineMode::Freehand,
            hidden: false,
        }
    }

    fn scheduler(
        store: &Arc<BoardStore>,
        cache: &Arc<MemoryCache>,
        debounce: Duration,
    ) -> SaveScheduler {
        SaveScheduler::new(
            Arc::clone(store),
            Arc::clone(cache) as Arc<dyn CacheStore>,
            "wb-".into(),
            Duration::from_secs(60),
            debounce,
        )
    }

    #[test]
    fn burst_coalesces_into_one_write_with_latest_state() {
        let store = Arc::new(BoardStore::new());
        let cache = Arc::new(MemoryCache::new());
        let saver = scheduler(&store, &cache, Duration::from_millis(60));

        let board = store.create_board(None).board_id;
        store.append_lines(board, vec![line(1)]);
        saver.request_save(board);
        thread::sleep(Duration::from_millis(20));
        store.append_lines(board, vec![line(2)]);
        saver.request_save(board);

        thread::sleep(Duration::from_millis(150));

        // One entry, reflecting both lines.
        assert_eq!(cache.len(), 1);
        let key = crate::server::board_key("wb-", board);
        let saved = Board::from_json(&cache.get(&key).unwrap().unwrap()).unwrap();
        assert_eq!(saved.line_hist.len(), 2);
    }

    #[test]
    fn flush_forces_pending_saves() {
        let store = Arc::new(BoardStore::new());
        let cache = Arc::new(MemoryCache::new());
        let saver = scheduler(&store, &cache, Duration::from_secs(3600));

        let board = store.create_board(None).board_id;
        saver.request_save(board);
        saver.flush().unwrap();

        let key = crate::server::board_key("wb-", board);
        assert!(cache.get(&key).unwrap().is_some());
    }

    #[test]
    fn drop_flushes_pending_saves() {
        let store = Arc::new(BoardStore::new());
        let cache = Arc::new(MemoryCache::new());
        let board = store.create_board(None).board_id;
        {
            let saver = scheduler(&store, &cache, Duration::from_secs(3600));
            saver.request_save(board);
        }
        let key = crate::server::board_key("wb-", board);
        assert!(cache.get(&key).unwrap().is_some());
    }

    #[test]
    fn new_scheduler_reports_enabled() {
        let store = Arc::new(BoardStore::new());
        let cache = Arc::new(MemoryCache::new());
        let saver = scheduler(&store, &cache, Duration::from_millis(10));
        assert!(saver.is_enabled());
    }

    #[test]
    fn disabled_scheduler_is_a_noop() {
        let saver = SaveScheduler::disabled();
        assert!(!saver.is_enabled());
        saver.request_save(BoardId::new());
        saver.flush().unwrap();
    }

    #[test]
    fn unknown_board_write_is_skipped() {
        let store = Arc::new(BoardStore::new());
        let cache = Arc::new(MemoryCache::new());
        let saver = scheduler(&store, &cache, Duration::from_millis(10));

        saver.request_save(BoardId::new());
        thread::sleep(Duration::from_millis(60));
        assert!(cache.is_empty());
        drop(saver);
    }
}
