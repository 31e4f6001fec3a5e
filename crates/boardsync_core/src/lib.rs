//! # boardsync core
//!
//! Board data model and the authoritative in-memory board store.
//!
//! This crate provides:
//! - Board, line and sticky-note types with their wire/cache JSON shape
//! - `BoardStore`, the per-board-serialized registry of live boards
//! - The versioned load protocol (`LoadOutcome`)
//! - The recency ranking of recently created boards

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod board;
mod error;
pub mod recency;
mod store;
mod types;

pub use board::{Board, Line, LineMode, Note};
pub use error::{CoreError, CoreResult};
pub use store::{BoardStore, LoadOutcome};
pub use types::{BoardId, VersionToken};
