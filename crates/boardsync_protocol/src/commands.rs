//! Client commands and acknowledgment payloads.

use boardsync_core::{Board, BoardId, Line, Note, VersionToken};
use serde::{Deserialize, Serialize};

/// A decoded client command.
#[derive(Debug, Clone, PartialEq)]
pub enum ClientCommand {
    /// Allocate a new board with a creation timestamp.
    CreateBoard {
        /// Optional advisory pin stored on the board.
        pin: Option<String>,
    },
    /// Load the bound board, optionally checking a cached version.
    Load {
        /// The caller's cached version, if any.
        version: Option<VersionToken>,
    },
    /// Append a line to the bound board's history.
    DrawLine(Line),
    /// Toggle a line's hidden flag.
    HideLine {
        /// The line id.
        id: u64,
        /// The new hidden value.
        hidden: bool,
    },
    /// Shallow-merge note fields onto the bound board.
    UpdateNote(Note),
    /// Toggle a note's hidden flag.
    HideNote {
        /// The note id.
        id: String,
        /// The new hidden value.
        hidden: bool,
    },
    /// Reset the bound board's history and notes.
    ClearBoard,
    /// List recently created boards.
    RecentBoards,
}

impl ClientCommand {
    /// Returns the wire event name of this command.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            ClientCommand::CreateBoard { .. } => "createBoard",
            ClientCommand::Load { .. } => "load",
            ClientCommand::DrawLine(_) => "drawLine",
            ClientCommand::HideLine { .. } => "hideLine",
            ClientCommand::UpdateNote(_) => "updateNote",
            ClientCommand::HideNote { .. } => "hideNote",
            ClientCommand::ClearBoard => "clearBoard",
            ClientCommand::RecentBoards => "recentBoards",
        }
    }
}

/// Reply status carried in acknowledgments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Status {
    /// The command succeeded.
    Ok,
    /// The caller's cached version is stale.
    OutdatedVersion,
    /// The board does not exist.
    NotFound,
}

/// Acknowledgment for `createBoard`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateBoardAck {
    /// The freshly allocated board id.
    pub board_id: BoardId,
}

/// Plain status acknowledgment (`clearBoard` and friends).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusAck {
    /// The reply status.
    pub status: Status,
}

/// Acknowledgment for `load`.
///
/// Serializes to `{status, ...board}` on success, `{status, version}`
/// when the caller's version is stale, and bare `{status}` otherwise.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LoadAck {
    /// The reply status.
    pub status: Status,
    /// Full board snapshot on `OK`. A flattened `None` emits nothing.
    #[serde(flatten)]
    pub board: Option<Board>,
    /// The live version on `OUTDATED_VERSION`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<VersionToken>,
}

impl LoadAck {
    /// A successful load carrying the snapshot.
    #[must_use]
    pub fn ok(board: Board) -> Self {
        Self {
            status: Status::Ok,
            board: Some(board),
            version: None,
        }
    }

    /// The caller's version is stale; reports the live one.
    #[must_use]
    pub fn outdated(current: VersionToken) -> Self {
        Self {
            status: Status::OutdatedVersion,
            board: None,
            version: Some(current),
        }
    }

    /// The board does not exist.
    #[must_use]
    pub fn not_found() -> Self {
        Self {
            status: Status::NotFound,
            board: None,
            version: None,
        }
    }
}
