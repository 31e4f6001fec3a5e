//! Error types for boardsync core.

use thiserror::Error;

/// Result type for core operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors that can occur in core board operations.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Board JSON could not be serialized or deserialized.
    #[error("board serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A board id string was not a valid id.
    #[error("invalid board id: {value}")]
    InvalidBoardId {
        /// The rejected input.
        value: String,
    },
}

impl CoreError {
    /// Creates an invalid board id error.
    pub fn invalid_board_id(value: impl Into<String>) -> Self {
        Self::InvalidBoardId {
            value: value.into(),
        }
    }
}
