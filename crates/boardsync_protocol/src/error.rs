//! Protocol decode errors.

use thiserror::Error;

/// Errors raised while decoding an inbound frame.
///
/// These never crash a session: the transport logs the frame and moves
/// on, per the no-op handling of malformed input.
#[derive(Debug, Error)]
pub enum DecodeError {
    /// The line was not a valid JSON frame envelope.
    #[error("malformed frame: {0}")]
    MalformedFrame(#[source] serde_json::Error),

    /// The frame named an event the server does not know.
    #[error("unknown event: {event}")]
    UnknownEvent {
        /// The offending event name.
        event: String,
    },

    /// The event requires a payload and none was supplied.
    #[error("missing payload for event: {event}")]
    MissingPayload {
        /// The event name.
        event: String,
    },

    /// The payload did not match the event's expected shape.
    #[error("bad payload for event {event}: {source}")]
    BadPayload {
        /// The event name.
        event: String,
        /// The underlying decode failure.
        #[source]
        source: serde_json::Error,
    },
}
