//! Recency ranking of recently created boards.
//!
//! A read-only derived view recomputed on each request; board counts
//! are expected to stay small, so nothing is cached.

use crate::board::Board;
use crate::store::BoardStore;

/// Maximum number of boards returned by [`recent_boards`].
pub const MAX_RECENT: usize = 9;

/// Returns up to [`MAX_RECENT`] boards sorted by creation time,
/// newest first.
///
/// Boards without a creation timestamp (lazily created, never
/// explicitly created) are excluded. Ties keep registration order,
/// the sort being stable.
#[must_use]
pub fn recent_boards(store: &BoardStore) -> Vec<Board> {
    let mut boards: Vec<Board> = store
        .snapshot_all()
        .into_iter()
        .filter(|b| b.created_timestamp.is_some())
        .collect();
    boards.sort_by(|a, b| b.created_timestamp.cmp(&a.created_timestamp));
    boards.truncate(MAX_RECENT);
    boards
}
