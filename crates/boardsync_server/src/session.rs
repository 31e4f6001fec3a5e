//! Per-connection protocol logic.
//!
//! A session is bound to at most one board, set once at connect time
//! from the handshake and never rebound. Handlers look up live state
//! in the board store on every command instead of holding a local
//! copy, so a connection never serves state that predates a clear.

use crate::error::ServerResult;
use crate::rooms::{ConnectionId, RoomRegistry};
use crate::saver::SaveScheduler;
use boardsync_core::{recency, BoardId, BoardStore, Line, LoadOutcome, Note, VersionToken};
use boardsync_protocol::{
    ClientCommand, CreateBoardAck, LoadAck, ServerEvent, Status, StatusAck,
};
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, info};

/// Shared state every session operates on.
pub struct SessionContext {
    /// The authoritative board store.
    pub store: Arc<BoardStore>,
    /// Room membership and broadcast fan-out.
    pub rooms: RoomRegistry,
    /// Debounced persistence.
    pub saver: SaveScheduler,
}

/// One connection's protocol state: its id and the board it is bound
/// to. Dropping the session leaves the room.
pub struct Session {
    connection: ConnectionId,
    board_id: Option<BoardId>,
    context: Arc<SessionContext>,
    /// Held for the session's lifetime so the outbound channel stays
    /// open even when no room holds a copy (unbound connections).
    _sender: UnboundedSender<ServerEvent>,
}

impl Session {
    /// Binds a connection to its (optional) board: joins the room and
    /// lazily creates board state so a first-ever board id works.
    pub(crate) fn bind(
        context: Arc<SessionContext>,
        connection: ConnectionId,
        board_id: Option<BoardId>,
        sender: UnboundedSender<ServerEvent>,
    ) -> Self {
        if let Some(board) = board_id {
            context.store.create_or_get(board);
            context.rooms.join(board, connection, sender.clone());
        }
        info!(%connection, board = ?board_id.map(|b| b.to_string()), "session bound");
        Self {
            connection,
            board_id,
            context,
            _sender: sender,
        }
    }

    /// Returns this session's connection id.
    #[must_use]
    pub fn connection(&self) -> ConnectionId {
        self.connection
    }

    /// Returns the bound board id, if any.
    #[must_use]
    pub fn board_id(&self) -> Option<BoardId> {
        self.board_id
    }

    /// Dispatches a decoded command and returns the acknowledgment
    /// payload for commands that reply.
    ///
    /// Commands addressing an unbound session or unknown line/note ids
    /// are no-ops, never faults; ack-bearing commands still reply.
    pub fn dispatch(&self, command: ClientCommand) -> ServerResult<Option<Value>> {
        debug!(connection = %self.connection, command = command.name(), "dispatch");
        Ok(match command {
            ClientCommand::CreateBoard { pin } => {
                Some(serde_json::to_value(self.handle_create_board(pin))?)
            }
            ClientCommand::Load { version } => {
                Some(serde_json::to_value(self.handle_load(version))?)
            }
            ClientCommand::DrawLine(line) => {
                self.handle_draw_line(line);
                None
            }
            ClientCommand::HideLine { id, hidden } => {
                self.handle_hide_line(id, hidden);
                None
            }
            ClientCommand::UpdateNote(note) => {
                self.handle_update_note(note);
                None
            }
            ClientCommand::HideNote { id, hidden } => {
                self.handle_hide_note(id, hidden);
                None
            }
            ClientCommand::ClearBoard => {
                Some(serde_json::to_value(self.handle_clear_board())?)
            }
            ClientCommand::RecentBoards => {
                Some(serde_json::to_value(self.handle_recent_boards())?)
            }
        })
    }

    /// Allocates a new board with a creation timestamp.
    pub fn handle_create_board(&self, pin: Option<String>) -> CreateBoardAck {
        let board = self.context.store.create_board(pin);
        self.context.saver.request_save(board.board_id);
        CreateBoardAck {
            board_id: board.board_id,
        }
    }

    /// Loads the bound board. An unbound session or an unknown board
    /// is `NOT_FOUND`; the explicit load path never creates.
    pub fn handle_load(&self, version: Option<VersionToken>) -> LoadAck {
        let Some(board) = self.board_id else {
            return LoadAck::not_found();
        };
        match self.context.store.load(board, version.as_ref(), false) {
            LoadOutcome::Ok(snapshot) => LoadAck::ok(snapshot),
            LoadOutcome::OutdatedVersion { current } => LoadAck::outdated(current),
            LoadOutcome::NotFound => LoadAck::not_found(),
        }
    }

    /// Appends the client's line and relays it verbatim to peers.
    pub fn handle_draw_line(&self, line: Line) {
        let Some(board) = self.board_id else {
            return;
        };
        self.context.store.append_lines(board, vec![line.clone()]);
        self.context
            .rooms
            .broadcast(board, &ServerEvent::DrawLine(line), Some(self.connection));
        self.context.saver.request_save(board);
    }

    /// Hides or reveals a line. On an effective change every room
    /// member, the sender included, gets a full-snapshot redraw.
    pub fn handle_hide_line(&self, id: u64, hidden: bool) {
        let Some(board) = self.board_id else {
            return;
        };
        if !self.context.store.set_line_hidden(board, id, hidden) {
            return;
        }
        if let Some(snapshot) = self.context.store.get(board) {
            self.context
                .rooms
                .broadcast(board, &ServerEvent::Redraw(snapshot), None);
        }
        self.context.saver.request_save(board);
    }

    /// Shallow-merges note fields and sends peers the merged note.
    pub fn handle_update_note(&self, note: Note) {
        let Some(board) = self.board_id else {
            return;
        };
        let merged = self.context.store.upsert_note(board, &note);
        self.context.rooms.broadcast(
            board,
            &ServerEvent::UpdateNote(merged),
            Some(self.connection),
        );
        self.context.saver.request_save(board);
    }

    /// Hides or reveals a note; the event bounces back to the sender's
    /// own other sessions too.
    pub fn handle_hide_note(&self, id: String, hidden: bool) {
        let Some(board) = self.board_id else {
            return;
        };
        if !self.context.store.set_note_hidden(board, &id, hidden) {
            return;
        }
        self.context
            .rooms
            .broadcast(board, &ServerEvent::HideNote { id, hidden }, None);
        self.context.saver.request_save(board);
    }

    /// Resets the bound board. Acks `OK` even when unbound.
    pub fn handle_clear_board(&self) -> StatusAck {
        if let Some(board) = self.board_id {
            self.context.store.clear(board);
            self.context
                .rooms
                .broadcast(board, &ServerEvent::ClearBoard, Some(self.connection));
            self.context.saver.request_save(board);
        }
        StatusAck { status: Status::Ok }
    }

    /// Lists recently created boards, newest first.
    pub fn handle_recent_boards(&self) -> Vec<boardsync_core::Board> {
        recency::recent_boards(&self.context.store)
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        if let Some(board) = self.board_id {
            self.context.rooms.leave(board, self.connection);
        }
        debug!(connection = %self.connection, "session closed");
    }
}
