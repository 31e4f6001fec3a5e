//! The authoritative in-memory board registry.

use crate::board::{Board, Line, Note};
use crate::types::{BoardId, VersionToken};
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

/// Outcome of a versioned load.
#[derive(Debug, Clone, PartialEq)]
pub enum LoadOutcome {
    /// The board snapshot, current as of the call.
    Ok(Board),
    /// The caller's cached version is stale; `current` is the live one.
    OutdatedVersion {
        /// The board's current version token.
        current: VersionToken,
    },
    /// The board does not exist and creation was not requested.
    NotFound,
}

struct Registry {
    boards: HashMap<BoardId, Arc<Mutex<Board>>>,
    /// Board ids in registration order, used for stable recency ties.
    order: Vec<BoardId>,
}

/// In-process registry of live boards.
///
/// The store is the source of truth while the process is alive. Every
/// mutating operation runs under the target board's own mutex, so
/// read-mutate-write is one uninterruptible step per board; the outer
/// registry lock is only held while resolving or inserting an entry,
/// never across a board mutation.
pub struct BoardStore {
    registry: RwLock<Registry>,
}

impl BoardStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self {
            registry: RwLock::new(Registry {
                boards: HashMap::new(),
                order: Vec::new(),
            }),
        }
    }

    fn entry(&self, id: BoardId) -> Option<Arc<Mutex<Board>>> {
        self.registry.read().boards.get(&id).map(Arc::clone)
    }

    fn entry_or_create(&self, id: BoardId) -> Arc<Mutex<Board>> {
        if let Some(entry) = self.entry(id) {
            return entry;
        }
        let mut registry = self.registry.write();
        // Double-checked: another caller may have created it meanwhile.
        if let Some(entry) = registry.boards.get(&id) {
            return Arc::clone(entry);
        }
        let entry = Arc::new(Mutex::new(Board::new(id)));
        registry.boards.insert(id, Arc::clone(&entry));
        registry.order.push(id);
        entry
    }

    /// Returns a snapshot of the board, or `None` if it does not exist.
    ///
    /// Never creates the board and never fabricates a creation
    /// timestamp.
    #[must_use]
    pub fn get(&self, id: BoardId) -> Option<Board> {
        self.entry(id).map(|entry| entry.lock().clone())
    }

    /// Explicitly creates a new board with a fresh time-ordered id,
    /// empty history and notes, and the current creation timestamp.
    pub fn create_board(&self, pin: Option<String>) -> Board {
        let id = BoardId::new();
        let entry = self.entry_or_create(id);
        let mut board = entry.lock();
        board.created_timestamp = Some(now_millis());
        board.pin = pin;
        board.clone()
    }

    /// Idempotent lazy create: returns the existing board or registers
    /// an empty one without a creation timestamp.
    pub fn create_or_get(&self, id: BoardId) -> Board {
        self.entry_or_create(id).lock().clone()
    }

    /// Registers a deserialized board as-is (the rehydration path).
    pub fn insert(&self, board: Board) {
        let entry = self.entry_or_create(board.board_id);
        *entry.lock() = board;
    }

    /// Appends lines to the board's draw history, lazily creating the
    /// board. Returns the refreshed version.
    pub fn append_lines(&self, id: BoardId, lines: Vec<Line>) -> VersionToken {
        let entry = self.entry_or_create(id);
        let mut board = entry.lock();
        board.line_hist.extend(lines);
        board.touch()
    }

    /// Sets a line's hidden flag.
    ///
    /// Returns `false` without touching the version when the board or
    /// line id is unknown or the stored value already matches.
    pub fn set_line_hidden(&self, id: BoardId, line_id: u64, hidden: bool) -> bool {
        let Some(entry) = self.entry(id) else {
            return false;
        };
        let mut board = entry.lock();
        let mut changed = false;
        for line in board.line_hist.iter_mut().filter(|l| l.id == line_id) {
            if line.hidden != hidden {
                line.hidden = hidden;
                changed = true;
            }
        }
        if changed {
            board.touch();
        }
        changed
    }

    /// Shallow-merges a note patch onto the board, lazily creating the
    /// board and the note. Returns the merged note.
    pub fn upsert_note(&self, id: BoardId, patch: &Note) -> Note {
        let entry = self.entry_or_create(id);
        let mut board = entry.lock();
        let note = board
            .note_list
            .entry(patch.id.clone())
            .or_insert_with(|| Note::new(patch.id.clone()));
        note.merge(patch);
        let merged = note.clone();
        board.touch();
        merged
    }

    /// Sets a note's hidden flag, with the same no-op rules as
    /// [`set_line_hidden`](Self::set_line_hidden).
    pub fn set_note_hidden(&self, id: BoardId, note_id: &str, hidden: bool) -> bool {
        let Some(entry) = self.entry(id) else {
            return false;
        };
        let mut board = entry.lock();
        let Some(note) = board.note_list.get_mut(note_id) else {
            return false;
        };
        let changed = note.set_hidden(hidden);
        if changed {
            board.touch();
        }
        changed
    }

    /// Replaces the board's history and notes with empty ones, lazily
    /// creating the board. The board id, creation timestamp and pin are
    /// preserved; the version is refreshed.
    pub fn clear(&self, id: BoardId) -> VersionToken {
        let entry = self.entry_or_create(id);
        let mut board = entry.lock();
        board.line_hist.clear();
        board.note_list.clear();
        board.touch()
    }

    /// Versioned load.
    ///
    /// With `create_missing`, an absent board is lazily created first,
    /// so the first load of a fresh id succeeds; without it, absence is
    /// `NotFound`. A supplied `expected_version` that does not match
    /// the current one yields `OutdatedVersion` carrying the live
    /// token, so the caller can refetch.
    pub fn load(
        &self,
        id: BoardId,
        expected_version: Option<&VersionToken>,
        create_missing: bool,
    ) -> LoadOutcome {
        let entry = if create_missing {
            self.entry_or_create(id)
        } else {
            match self.entry(id) {
                Some(entry) => entry,
                None => return LoadOutcome::NotFound,
            }
        };
        let board = entry.lock();
        match expected_version {
            Some(expected) if *expected != board.version => LoadOutcome::OutdatedVersion {
                current: board.version,
            },
            _ => LoadOutcome::Ok(board.clone()),
        }
    }

    /// Snapshots every board in registration order.
    #[must_use]
    pub fn snapshot_all(&self) -> Vec<Board> {
        let registry = self.registry.read();
        registry
            .order
            .iter()
            .filter_map(|id| registry.boards.get(id))
            .map(|entry| entry.lock().clone())
            .collect()
    }

    /// Returns the ids of all registered boards, in registration order.
    #[must_use]
    pub fn board_ids(&self) -> Vec<BoardId> {
        self.registry.read().order.clone()
    }

    /// Returns the number of registered boards.
    #[must_use]
    pub fn len(&self) -> usize {
        self.registry.read().boards.len()
    }

    /// Returns `true` if no boards are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for BoardStore {
    fn default() -> Self {
        Self::new()
    }
}

/// Milliseconds since the Unix epoch.
fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
