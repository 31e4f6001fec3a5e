//! Server-to-client broadcast events.

use boardsync_core::{Board, Line, Note};
use serde_json::Value;

/// An event broadcast to the members of a board's room.
#[derive(Debug, Clone, PartialEq)]
pub enum ServerEvent {
    /// A peer drew a line.
    DrawLine(Line),
    /// The board changed in a way that requires a full redraw
    /// (a line was hidden); carries the whole snapshot.
    Redraw(Board),
    /// A note was created or updated; carries the merged note.
    UpdateNote(Note),
    /// A note's hidden flag changed.
    HideNote {
        /// The note id.
        id: String,
        /// The new hidden value.
        hidden: bool,
    },
    /// The board was cleared.
    ClearBoard,
}

impl ServerEvent {
    /// Returns the wire event name.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            ServerEvent::DrawLine(_) => "drawLine",
            ServerEvent::Redraw(_) => "redraw",
            ServerEvent::UpdateNote(_) => "updateNote",
            ServerEvent::HideNote { .. } => "hideNote",
            ServerEvent::ClearBoard => "clearBoard",
        }
    }

    /// Returns the event's JSON payload, if it carries one.
    pub fn payload(&self) -> serde_json::Result<Option<Value>> {
        Ok(match self {
            ServerEvent::DrawLine(line) => Some(serde_json::to_value(line)?),
            ServerEvent::Redraw(board) => Some(serde_json::to_value(board)?),
            ServerEvent::UpdateNote(note) => Some(serde_json::to_value(note)?),
            ServerEvent::HideNote { id, hidden } => {
                Some(serde_json::json!({"id": id, "hidden": hidden}))
            }
            ServerEvent::ClearBoard => None,
        })
    }
}
