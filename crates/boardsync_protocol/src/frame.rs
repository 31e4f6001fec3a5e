//! Newline-delimited JSON framing.
//!
//! Inbound frames look like `{"event": <name>, "data": <payload?>,
//! "ack": <id?>}`; the first frame of a connection may be a
//! `handshake` binding it to a board. Outbound frames are either an
//! acknowledgment `{"ack": <id>, "data": <payload>}` or a broadcast
//! `{"event": <name>, "data": <payload?>}`.

use crate::commands::ClientCommand;
use crate::error::DecodeError;
use crate::events::ServerEvent;
use boardsync_core::{BoardId, Line, Note, VersionToken};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A decoded inbound frame.
#[derive(Debug, Clone, PartialEq)]
pub enum Inbound {
    /// Connection handshake, optionally binding a board.
    Handshake {
        /// The board to bind, absent for "no board yet".
        board_id: Option<BoardId>,
    },
    /// A client command, optionally expecting an acknowledgment.
    Command {
        /// The decoded command.
        command: ClientCommand,
        /// Acknowledgment id to echo back, if the client wants one.
        ack: Option<u64>,
    },
}

#[derive(Deserialize)]
struct ClientFrame {
    event: String,
    #[serde(default)]
    data: Option<Value>,
    #[serde(default)]
    ack: Option<u64>,
}

#[derive(Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct HandshakeParams {
    board_id: Option<BoardId>,
}

#[derive(Default, Deserialize)]
struct CreateBoardParams {
    pin: Option<String>,
}

#[derive(Default, Deserialize)]
struct LoadParams {
    version: Option<VersionToken>,
}

#[derive(Deserialize)]
struct HideLineParams {
    id: u64,
    hidden: bool,
}

#[derive(Deserialize)]
struct HideNoteParams {
    id: String,
    hidden: bool,
}

/// Decodes one frame line into a handshake or command.
pub fn decode_frame(line: &str) -> Result<Inbound, DecodeError> {
    let frame: ClientFrame =
        serde_json::from_str(line).map_err(DecodeError::MalformedFrame)?;

    let inbound = match frame.event.as_str() {
        "handshake" => {
            let params: HandshakeParams = payload_or_default(&frame)?;
            Inbound::Handshake {
                board_id: params.board_id,
            }
        }
        "createBoard" => {
            let params: CreateBoardParams = payload_or_default(&frame)?;
            command(ClientCommand::CreateBoard { pin: params.pin }, frame.ack)
        }
        "load" => {
            let params: LoadParams = payload_or_default(&frame)?;
            command(
                ClientCommand::Load {
                    version: params.version,
                },
                frame.ack,
            )
        }
        "drawLine" => {
            let line: Line = required_payload(&frame)?;
            command(ClientCommand::DrawLine(line), frame.ack)
        }
        "hideLine" => {
            let params: HideLineParams = required_payload(&frame)?;
            command(
                ClientCommand::HideLine {
                    id: params.id,
                    hidden: params.hidden,
                },
                frame.ack,
            )
        }
        "updateNote" => {
            let note: Note = required_payload(&frame)?;
            command(ClientCommand::UpdateNote(note), frame.ack)
        }
        "hideNote" => {
            let params: HideNoteParams = required_payload(&frame)?;
            command(
                ClientCommand::HideNote {
                    id: params.id,
                    hidden: params.hidden,
                },
                frame.ack,
            )
        }
        "clearBoard" => command(ClientCommand::ClearBoard, frame.ack),
        "recentBoards" => command(ClientCommand::RecentBoards, frame.ack),
        _ => {
            return Err(DecodeError::UnknownEvent {
                event: frame.event,
            })
        }
    };
    Ok(inbound)
}

fn command(command: ClientCommand, ack: Option<u64>) -> Inbound {
    Inbound::Command { command, ack }
}

fn payload_or_default<T: DeserializeOwned + Default>(
    frame: &ClientFrame,
) -> Result<T, DecodeError> {
    match &frame.data {
        None | Some(Value::Null) => Ok(T::default()),
        Some(data) => {
            serde_json::from_value(data.clone()).map_err(|source| DecodeError::BadPayload {
                event: frame.event.clone(),
                source,
            })
        }
    }
}

fn required_payload<T: DeserializeOwned>(frame: &ClientFrame) -> Result<T, DecodeError> {
    match &frame.data {
        None | Some(Value::Null) => Err(DecodeError::MissingPayload {
            event: frame.event.clone(),
        }),
        Some(data) => {
            serde_json::from_value(data.clone()).map_err(|source| DecodeError::BadPayload {
                event: frame.event.clone(),
                source,
            })
        }
    }
}

#[derive(Serialize)]
struct AckFrame<'a, T: Serialize> {
    ack: u64,
    data: &'a T,
}

#[derive(Serialize)]
struct EventFrame<'a> {
    event: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<Value>,
}

/// Encodes an acknowledgment frame (without the trailing newline).
pub fn encode_ack<T: Serialize>(ack: u64, data: &T) -> serde_json::Result<String> {
    serde_json::to_string(&AckFrame { ack, data })
}

/// Encodes a broadcast event frame (without the trailing newline).
pub fn encode_event(event: &ServerEvent) -> serde_json::Result<String> {
    serde_json::to_string(&EventFrame {
        event: event.name(),
        data: event.payload()?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::StatusAck;
    use crate::Status;
    use serde_json::json;

    #[test]
    fn handshake_with_and_without_board() {
        let id = BoardId::new();
        let frame = format!(r#"{{"event":"handshake","data":{{"boardId":"{id}"}}}}"#);
        assert_eq!(
            decode_frame(&frame).unwrap(),
            Inbound::Handshake { board_id: Some(id) }
        );

        assert_eq!(
            decode_frame(r#"{"event":"handshake"}"#).unwrap(),
            Inbound::Handshake { board_id: None }
        );
    }

    #[test]
    fn draw_line_requires_a_payload() {
        let err = decode_frame(r#"{"event":"drawLine"}"#).unwrap_err();
        assert!(matches!(err, DecodeError::MissingPayload { .. }));

        let decoded =
            decode_frame(r#"{"event":"drawLine","data":{"id":1,"x0":0,"y0":0,"x1":5,"y1":5}}"#)
                .unwrap();
        match decoded {
            Inbound::Command {
                command: ClientCommand::DrawLine(line),
                ack: None,
            } => assert_eq!(line.id, 1),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn create_board_carries_the_ack_id() {
        let decoded = decode_frame(r#"{"event":"createBoard","ack":7}"#).unwrap();
        assert_eq!(
            decoded,
            Inbound::Command {
                command: ClientCommand::CreateBoard { pin: None },
                ack: Some(7),
            }
        );
    }

    #[test]
    fn load_accepts_an_optional_version() {
        let decoded = decode_frame(r#"{"event":"load","ack":1}"#).unwrap();
        assert_eq!(
            decoded,
            Inbound::Command {
                command: ClientCommand::Load { version: None },
                ack: Some(1),
            }
        );

        let version = VersionToken::new();
        let frame = format!(r#"{{"event":"load","data":{{"version":"{version}"}},"ack":2}}"#);
        match decode_frame(&frame).unwrap() {
            Inbound::Command {
                command: ClientCommand::Load { version: Some(v) },
                ..
            } => assert_eq!(v, version),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn unknown_event_is_rejected() {
        let err = decode_frame(r#"{"event":"teleport"}"#).unwrap_err();
        assert!(matches!(err, DecodeError::UnknownEvent { event } if event == "teleport"));
    }

    #[test]
    fn garbage_is_a_malformed_frame() {
        assert!(matches!(
            decode_frame("not json").unwrap_err(),
            DecodeError::MalformedFrame(_)
        ));
    }

    #[test]
    fn bad_payload_reports_the_event() {
        let err = decode_frame(r#"{"event":"hideLine","data":{"id":"nope"}}"#).unwrap_err();
        assert!(matches!(err, DecodeError::BadPayload { event, .. } if event == "hideLine"));
    }

    #[test]
    fn ack_frame_shape() {
        let encoded = encode_ack(3, &StatusAck { status: Status::Ok }).unwrap();
        let value: Value = serde_json::from_str(&encoded).unwrap();
        assert_eq!(value, json!({"ack": 3, "data": {"status": "OK"}}));
    }

    #[test]
    fn event_frame_omits_absent_data() {
        let encoded = encode_event(&ServerEvent::ClearBoard).unwrap();
        let value: Value = serde_json::from_str(&encoded).unwrap();
        assert_eq!(value, json!({"event": "clearBoard"}));
    }
}
