//! # boardsync server
//!
//! The board synchronization engine: per-connection sessions bound to
//! a board room, broadcast fan-out of draw/note events, debounced
//! persistence to a durable cache, and rehydration on startup.
//!
//! # Architecture
//!
//! The engine itself is synchronous: every board mutation runs under
//! that board's mutex inside [`boardsync_core::BoardStore`], and
//! persistence happens on a dedicated worker thread behind
//! [`SaveScheduler`]. Only the transport is async: one tokio task per
//! connection multiplexing inbound frames and outbound room events
//! over a newline-delimited JSON stream.
//!
//! # Example
//!
//! ```rust,no_run
//! use boardsync_server::{BoardServer, ServerConfig};
//! use std::sync::Arc;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let config = ServerConfig::from_env();
//! let server = Arc::new(BoardServer::new(config)?);
//! boardsync_server::run(server).await?;
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

mod config;
mod error;
mod rooms;
mod saver;
mod server;
mod session;
mod transport;

pub use config::ServerConfig;
pub use error::{ServerError, ServerResult};
pub use rooms::{ConnectionId, RoomRegistry};
pub use saver::SaveScheduler;
pub use server::{board_key, BoardServer};
pub use session::{Session, SessionContext};
pub use transport::{run, serve};
