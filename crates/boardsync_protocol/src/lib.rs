//! # boardsync wire protocol
//!
//! Typed commands, server events and acknowledgment payloads, plus the
//! newline-delimited JSON framing used by the transport.
//!
//! This is a pure protocol crate with no I/O operations.

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod commands;
mod error;
mod events;
mod frame;

pub use commands::{ClientCommand, CreateBoardAck, LoadAck, Status, StatusAck};
pub use error::DecodeError;
pub use events::ServerEvent;
pub use frame::{decode_frame, encode_ack, encode_event, Inbound};
