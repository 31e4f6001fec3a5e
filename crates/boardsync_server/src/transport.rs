//! Newline-delimited JSON transport over TCP.
//!
//! One tokio task per connection multiplexes inbound frames and
//! outbound room events onto the socket. The first inbound frame is
//! expected to be a `handshake` binding the connection to a board; a
//! connection that skips it is bound to no board, and a first frame
//! that is already a command is processed as such.

use crate::error::ServerResult;
use crate::server::BoardServer;
use crate::session::Session;
use boardsync_protocol::{decode_frame, encode_ack, encode_event, Inbound};
use serde_json::Value;
use std::sync::Arc;
use tokio::io::{AsyncWriteExt, BufReader};
use tokio::io::AsyncBufReadExt;
use tokio::net::tcp::OwnedWriteHalf;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc::unbounded_channel;
use tracing::{debug, info, warn};

/// Binds the configured address and serves connections until the task
/// is cancelled.
pub async fn run(server: Arc<BoardServer>) -> ServerResult<()> {
    let listener = TcpListener::bind(server.config().bind_addr).await?;
    serve(server, listener).await
}

/// Serves connections from an already-bound listener.
pub async fn serve(server: Arc<BoardServer>, listener: TcpListener) -> ServerResult<()> {
    info!(addr = %listener.local_addr()?, "listening");
    loop {
        let (stream, peer) = listener.accept().await?;
        debug!(%peer, "connection accepted");
        let server = Arc::clone(&server);
        tokio::spawn(async move {
            if let Err(err) = handle_connection(server, stream).await {
                debug!(%peer, %err, "connection ended with error");
            }
        });
    }
}

async fn handle_connection(server: Arc<BoardServer>, stream: TcpStream) -> ServerResult<()> {
    let (read_half, mut writer) = stream.into_split();
    let mut lines = BufReader::new(read_half).lines();
    let (tx, mut rx) = unbounded_channel();

    // The handshake decides the lifetime board binding. Anything else
    // in the first frame leaves the connection unbound and is handled
    // as a regular command.
    let mut first_command = None;
    let board_id = match lines.next_line().await? {
        Some(line) => match decode_frame(&line) {
            Ok(Inbound::Handshake { board_id }) => board_id,
            Ok(inbound) => {
                first_command = Some(inbound);
                None
            }
            Err(err) => {
                warn!(%err, "dropping malformed first frame");
                None
            }
        },
        None => return Ok(()),
    };

    let session = server.connect(board_id, tx);
    info!(connection = %session.connection(), "connection open");

    if let Some(inbound) = first_command {
        process(&session, inbound, &mut writer).await?;
    }

    loop {
        tokio::select! {
            line = lines.next_line() => {
                match line {
                    Ok(Some(line)) => {
                        match decode_frame(&line) {
                            Ok(inbound) => process(&session, inbound, &mut writer).await?,
                            Err(err) => warn!(
                                connection = %session.connection(),
                                %err,
                                "dropping malformed frame"
                            ),
                        }
                    }
                    Ok(None) => break,
                    Err(err) => {
                        debug!(connection = %session.connection(), %err, "read failed");
                        break;
                    }
                }
            }
            event = rx.recv() => {
                match event {
                    Some(event) => {
                        let frame = encode_event(&event)?;
                        write_line(&mut writer, &frame).await?;
                    }
                    None => break,
                }
            }
        }
    }

    info!(connection = %session.connection(), "connection closed");
    Ok(())
}

async fn process(
    session: &Session,
    inbound: Inbound,
    writer: &mut OwnedWriteHalf,
) -> ServerResult<()> {
    match inbound {
        Inbound::Handshake { .. } => {
            // A connection is bound once, at connect time.
            debug!(connection = %session.connection(), "ignoring mid-stream handshake");
        }
        Inbound::Command { command, ack } => {
            let reply = session.dispatch(command)?;
            if let (Some(ack), Some(payload)) = (ack, reply) {
                let frame = encode_ack::<Value>(ack, &payload)?;
                write_line(writer, &frame).await?;
            }
        }
    }
    Ok(())
}

async fn write_line(writer: &mut OwnedWriteHalf, frame: &str) -> ServerResult<()> {
    writer.write_all(frame.as_bytes()).await?;
    writer.write_all(b"\n").await?;
    Ok(())
}
