//! Room membership and broadcast fan-out.

use boardsync_core::BoardId;
use boardsync_protocol::ServerEvent;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::fmt;
use tokio::sync::mpsc::UnboundedSender;

/// Identifier of a live connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(u64);

impl ConnectionId {
    /// Creates a connection ID from a raw counter value.
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn:{}", self.0)
    }
}

struct Member {
    connection: ConnectionId,
    sender: UnboundedSender<ServerEvent>,
}

/// Registry of board rooms: the live connections bound to each board.
///
/// Broadcast is fire-and-forget; a member whose channel is gone is
/// pruned on the spot. Each broadcast completes under the registry
/// lock before the next begins and member channels are FIFO, so
/// per-room, per-sender emission order is preserved end to end.
pub struct RoomRegistry {
    rooms: RwLock<HashMap<BoardId, Vec<Member>>>,
}

impl RoomRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            rooms: RwLock::new(HashMap::new()),
        }
    }

    /// Adds a connection to a board's room.
    pub fn join(
        &self,
        board: BoardId,
        connection: ConnectionId,
        sender: UnboundedSender<ServerEvent>,
    ) {
        self.rooms
            .write()
            .entry(board)
            .or_default()
            .push(Member { connection, sender });
    }

    /// Removes a connection from a board's room.
    pub fn leave(&self, board: BoardId, connection: ConnectionId) {
        let mut rooms = self.rooms.write();
        if let Some(members) = rooms.get_mut(&board) {
            members.retain(|m| m.connection != connection);
            if members.is_empty() {
                rooms.remove(&board);
            }
        }
    }

    /// Delivers an event to every member of the board's room, except
    /// `exclude` when given. Returns the number of deliveries.
    pub fn broadcast(
        &self,
        board: BoardId,
        event: &ServerEvent,
        exclude: Option<ConnectionId>,
    ) -> usize {
        let mut rooms = self.rooms.write();
        let Some(members) = rooms.get_mut(&board) else {
            return 0;
        };
        let mut delivered = 0;
        members.retain(|member| {
            if exclude == Some(member.connection) {
                return true;
            }
            let alive = member.sender.send(event.clone()).is_ok();
            if alive {
                delivered += 1;
            }
            alive
        });
        if members.is_empty() {
            rooms.remove(&board);
        }
        delivered
    }

    /// Returns the number of members in a board's room.
    #[must_use]
    pub fn member_count(&self, board: BoardId) -> usize {
        self.rooms.read().get(&board).map_or(0, Vec::len)
    }
}

impl Default for RoomRegistry {
    fn default() -> Self {
        Self::new()
    }
}
