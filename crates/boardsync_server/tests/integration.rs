//! End-to-end tests over a real TCP socket.

use boardsync_cache::{CacheStore, MemoryCache};
use boardsync_core::{Board, BoardId};
use boardsync_server::{board_key, BoardServer, ServerConfig};
use serde_json::{json, Value};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::{TcpListener, TcpStream};
use tokio::time::timeout;

async fn start_server(cache: Option<Arc<MemoryCache>>) -> (SocketAddr, Arc<BoardServer>) {
    let config = ServerConfig::default().with_save_debounce(Duration::from_millis(100));
    let server = Arc::new(
        BoardServer::with_cache(config, cache.map(|c| c as Arc<dyn CacheStore>)).unwrap(),
    );
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let serve_server = Arc::clone(&server);
    tokio::spawn(async move {
        let _ = boardsync_server::serve(serve_server, listener).await;
    });
    (addr, server)
}

struct TestClient {
    lines: Lines<BufReader<OwnedReadHalf>>,
    writer: OwnedWriteHalf,
}

impl TestClient {
    async fn connect(addr: SocketAddr, board: Option<BoardId>) -> Self {
        let stream = TcpStream::connect(addr).await.unwrap();
        let (read_half, writer) = stream.into_split();
        let mut client = Self {
            lines: BufReader::new(read_half).lines(),
            writer,
        };
        let data = match board {
            Some(board) => json!({"boardId": board.to_string()}),
            None => Value::Null,
        };
        client.send(json!({"event": "handshake", "data": data})).await;
        client
    }

    async fn send(&mut self, frame: Value) {
        let mut line = frame.to_string();
        line.push('\n');
        self.writer.write_all(line.as_bytes()).await.unwrap();
    }

    async fn recv(&mut self) -> Value {
        let line = timeout(Duration::from_secs(2), self.lines.next_line())
            .await
            .expect("timed out waiting for a frame")
            .unwrap()
            .expect("connection closed");
        serde_json::from_str(&line).unwrap()
    }

    async fn expect_silence(&mut self) {
        let got = timeout(Duration::from_millis(200), self.lines.next_line()).await;
        assert!(got.is_err(), "expected no frame, got {got:?}");
    }
}

#[tokio::test]
async fn create_board_acks_with_a_fresh_id() {
    let (addr, _server) = start_server(None).await;
    let mut client = TestClient::connect(addr, None).await;

    client
        .send(json!({"event": "createBoard", "ack": 1}))
        .await;
    let reply = client.recv().await;

    assert_eq!(reply["ack"], 1);
    let board_id = reply["data"]["boardId"].as_str().unwrap();
    assert!(board_id.parse::<BoardId>().is_ok());
}

#[tokio::test]
async fn draw_reaches_peers_but_not_the_sender() {
    let (addr, _server) = start_server(None).await;

    let mut lobby = TestClient::connect(addr, None).await;
    lobby.send(json!({"event": "createBoard", "ack": 1})).await;
    let reply = lobby.recv().await;
    let board: BoardId = reply["data"]["boardId"].as_str().unwrap().parse().unwrap();

    let mut client_a = TestClient::connect(addr, Some(board)).await;
    let mut client_b = TestClient::connect(addr, Some(board)).await;
    // Make sure A is in the room before B draws: a load ack proves the
    // server finished binding A.
    client_a.send(json!({"event": "load", "ack": 1})).await;
    client_a.recv().await;

    client_b
        .send(json!({
            "event": "drawLine",
            "data": {"id": 1, "x0": 0, "y0": 0, "x1": 9, "y1": 9, "color": "#000", "width": 2}
        }))
        .await;

    let event = client_a.recv().await;
    assert_eq!(event["event"], "drawLine");
    assert_eq!(event["data"]["id"], 1);

    client_b.expect_silence().await;
}

#[tokio::test]
async fn hide_line_redraws_everyone_including_the_sender() {
    let (addr, _server) = start_server(None).await;
    let board = BoardId::new();

    let mut client_a = TestClient::connect(addr, Some(board)).await;
    let mut client_b = TestClient::connect(addr, Some(board)).await;
    client_b.send(json!({"event": "load", "ack": 1})).await;
    client_b.recv().await;

    client_a
        .send(json!({"event": "drawLine", "data": {"id": 1, "x1": 5, "y1": 5}}))
        .await;
    let draw = client_b.recv().await;
    assert_eq!(draw["event"], "drawLine");

    client_a
        .send(json!({"event": "hideLine", "data": {"id": 1, "hidden": true}}))
        .await;

    for client in [&mut client_a, &mut client_b] {
        let event = client.recv().await;
        assert_eq!(event["event"], "redraw");
        assert_eq!(event["data"]["lineHist"][0]["hidden"], true);
    }
}

#[tokio::test]
async fn load_tracks_versions() {
    let (addr, _server) = start_server(None).await;
    let board = BoardId::new();
    let mut client = TestClient::connect(addr, Some(board)).await;

    client.send(json!({"event": "load", "ack": 1})).await;
    let first = client.recv().await;
    assert_eq!(first["data"]["status"], "OK");
    let stale = first["data"]["version"].as_str().unwrap().to_string();

    client
        .send(json!({"event": "drawLine", "data": {"id": 1}}))
        .await;
    client
        .send(json!({"event": "load", "data": {"version": stale}, "ack": 2}))
        .await;
    let outdated = client.recv().await;
    assert_eq!(outdated["ack"], 2);
    assert_eq!(outdated["data"]["status"], "OUTDATED_VERSION");
    let current = outdated["data"]["version"].as_str().unwrap().to_string();
    assert_ne!(current, stale);

    client
        .send(json!({"event": "load", "data": {"version": current}, "ack": 3}))
        .await;
    let ok = client.recv().await;
    assert_eq!(ok["data"]["status"], "OK");
    assert_eq!(ok["data"]["version"].as_str().unwrap(), current);
    assert_eq!(ok["data"]["lineHist"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn unbound_load_is_not_found() {
    let (addr, _server) = start_server(None).await;
    let mut client = TestClient::connect(addr, None).await;

    client.send(json!({"event": "load", "ack": 1})).await;
    let reply = client.recv().await;
    assert_eq!(reply["data"], json!({"status": "NOT_FOUND"}));
}

#[tokio::test]
async fn clear_board_acks_and_notifies_peers() {
    let (addr, _server) = start_server(None).await;
    let board = BoardId::new();
    let mut client_a = TestClient::connect(addr, Some(board)).await;
    let mut client_b = TestClient::connect(addr, Some(board)).await;
    client_b.send(json!({"event": "load", "ack": 1})).await;
    client_b.recv().await;

    client_a
        .send(json!({"event": "drawLine", "data": {"id": 1}}))
        .await;
    client_b.recv().await;

    client_a.send(json!({"event": "clearBoard", "ack": 9})).await;
    let ack = client_a.recv().await;
    assert_eq!(ack, json!({"ack": 9, "data": {"status": "OK"}}));

    let event = client_b.recv().await;
    assert_eq!(event["event"], "clearBoard");
}

#[tokio::test]
async fn unbound_connections_stay_open_for_lobby_commands() {
    let (addr, _server) = start_server(None).await;
    let mut client = TestClient::connect(addr, None).await;

    // A connection with no board yet must survive idling and still
    // answer lobby commands rather than being torn down.
    tokio::time::sleep(Duration::from_millis(300)).await;

    client.send(json!({"event": "recentBoards", "ack": 1})).await;
    let reply = client.recv().await;
    assert_eq!(reply["ack"], 1);
    assert_eq!(reply["data"], json!([]));

    client.send(json!({"event": "createBoard", "ack": 2})).await;
    let reply = client.recv().await;
    assert_eq!(reply["ack"], 2);
    assert!(reply["data"]["boardId"].as_str().unwrap().parse::<BoardId>().is_ok());
}

#[tokio::test]
async fn malformed_frames_are_ignored() {
    let (addr, _server) = start_server(None).await;
    let mut client = TestClient::connect(addr, None).await;

    client.send(json!({"event": "teleport", "ack": 1})).await;
    client
        .send(json!({"event": "hideLine", "data": {"id": "wrong-type"}}))
        .await;

    // The connection survives and keeps answering.
    client.send(json!({"event": "recentBoards", "ack": 2})).await;
    let reply = client.recv().await;
    assert_eq!(reply["ack"], 2);
    assert_eq!(reply["data"], json!([]));
}

#[tokio::test]
async fn recent_boards_lists_created_boards() {
    let (addr, _server) = start_server(None).await;
    let mut client = TestClient::connect(addr, None).await;

    client
        .send(json!({"event": "createBoard", "data": {"pin": "1234"}, "ack": 1}))
        .await;
    let created = client.recv().await;
    let board_id = created["data"]["boardId"].as_str().unwrap().to_string();

    client.send(json!({"event": "recentBoards", "ack": 2})).await;
    let reply = client.recv().await;
    let list = reply["data"].as_array().unwrap();
    assert_eq!(list.len(), 1);
    assert_eq!(list[0]["boardId"], board_id.as_str());
    assert_eq!(list[0]["pin"], "1234");
}

#[tokio::test]
async fn burst_of_draws_persists_once_with_both_lines() {
    let cache = Arc::new(MemoryCache::new());
    let (addr, _server) = start_server(Some(Arc::clone(&cache))).await;
    let board = BoardId::new();
    let mut client = TestClient::connect(addr, Some(board)).await;

    client
        .send(json!({"event": "drawLine", "data": {"id": 1}}))
        .await;
    tokio::time::sleep(Duration::from_millis(30)).await;
    client
        .send(json!({"event": "drawLine", "data": {"id": 2}}))
        .await;

    tokio::time::sleep(Duration::from_millis(400)).await;

    assert_eq!(cache.len(), 1);
    let saved = cache
        .get(&board_key("whiteboard-", board))
        .unwrap()
        .unwrap();
    let saved = Board::from_json(&saved).unwrap();
    assert_eq!(saved.line_hist.len(), 2);
}

#[tokio::test]
async fn boards_survive_a_restart_on_a_file_cache() {
    let dir = tempfile::tempdir().unwrap();
    let url = format!("file://{}", dir.path().display());
    let config = ServerConfig::default()
        .with_cache_url(url)
        .with_save_debounce(Duration::from_millis(100));

    let board;
    {
        let server = Arc::new(BoardServer::new(config.clone()).unwrap());
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let serve_server = Arc::clone(&server);
        tokio::spawn(async move {
            let _ = boardsync_server::serve(serve_server, listener).await;
        });

        let mut client = TestClient::connect(addr, None).await;
        client.send(json!({"event": "createBoard", "ack": 1})).await;
        let reply = client.recv().await;
        board = reply["data"]["boardId"].as_str().unwrap().to_string();
        server.close().unwrap();
    }

    let server = BoardServer::new(config).unwrap();
    let restored: BoardId = board.parse().unwrap();
    assert!(server.store().get(restored).is_some());
}

#[tokio::test]
async fn boards_survive_a_server_restart() {
    let cache = Arc::new(MemoryCache::new());
    let (addr, server) = start_server(Some(Arc::clone(&cache))).await;

    let mut client = TestClient::connect(addr, None).await;
    client.send(json!({"event": "createBoard", "ack": 1})).await;
    let reply = client.recv().await;
    let board: BoardId = reply["data"]["boardId"].as_str().unwrap().parse().unwrap();
    server.close().unwrap();

    // A new process over the same cache sees the board.
    let (addr, _restarted) = start_server(Some(Arc::clone(&cache))).await;
    let mut client = TestClient::connect(addr, Some(board)).await;
    client.send(json!({"event": "load", "ack": 1})).await;
    let reply = client.recv().await;
    assert_eq!(reply["data"]["status"], "OK");
    assert_eq!(reply["data"]["boardId"].as_str().unwrap(), board.to_string());
}
