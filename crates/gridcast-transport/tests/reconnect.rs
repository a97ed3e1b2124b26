//! Integration tests for the reconnecting socket.
//!
//! These spin up a real loopback WebSocket server so the connect,
//! dispatch, reconnect, and disconnect paths are exercised over an
//! actual network socket rather than mocks.

use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use gridcast_protocol::{
    BoardId, ClientCommand, GameId, Outcome, Piece, TaggedCodec,
};
use gridcast_transport::{BackoffConfig, ConnectionStatus, RealtimeSocket, SocketEvents};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;

type ServerWs = tokio_tungstenite::WebSocketStream<TcpStream>;

/// What the handler under test observed, in order.
#[derive(Debug, PartialEq)]
enum Observed {
    Connected,
    Disconnected,
    Created(u32),
    Updated(u32, usize, Piece),
    Ended(u32, Outcome),
    Viewers(u64),
}

/// Forwards every callback into a channel the test can drain.
struct Probe {
    tx: mpsc::UnboundedSender<Observed>,
}

impl SocketEvents for Probe {
    fn on_create(&mut self, board: BoardId) {
        let _ = self.tx.send(Observed::Created(board.0));
    }
    fn on_update(&mut self, board: BoardId, position: usize, piece: Piece) {
        let _ = self.tx.send(Observed::Updated(board.0, position, piece));
    }
    fn on_end(&mut self, board: BoardId, outcome: Outcome, _line: Option<[usize; 3]>) {
        let _ = self.tx.send(Observed::Ended(board.0, outcome));
    }
    fn on_viewer_count(&mut self, count: u64) {
        let _ = self.tx.send(Observed::Viewers(count));
    }
    fn on_connected(&mut self) {
        let _ = self.tx.send(Observed::Connected);
    }
    fn on_disconnected(&mut self) {
        let _ = self.tx.send(Observed::Disconnected);
    }
}

/// Binds a loopback server that hands each accepted WebSocket to the test.
async fn spawn_server() -> (String, mpsc::UnboundedReceiver<ServerWs>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let url = format!("ws://{}", listener.local_addr().unwrap());
    let (tx, rx) = mpsc::unbounded_channel();
    tokio::spawn(async move {
        while let Ok((stream, _)) = listener.accept().await {
            let Ok(ws) = tokio_tungstenite::accept_async(stream).await else {
                continue;
            };
            if tx.send(ws).is_err() {
                break;
            }
        }
    });
    (url, rx)
}

/// Short delays so the reconnect tests finish quickly.
fn fast_backoff() -> BackoffConfig {
    BackoffConfig {
        floor: Duration::from_millis(30),
        step: Duration::from_millis(30),
        ceiling: Duration::from_millis(200),
    }
}

fn socket(url: &str) -> (RealtimeSocket<TaggedCodec, Probe>, mpsc::UnboundedReceiver<Observed>) {
    let (tx, rx) = mpsc::unbounded_channel();
    let socket =
        RealtimeSocket::with_backoff(url, TaggedCodec, Probe { tx }, fast_backoff());
    (socket, rx)
}

async fn recv(observed: &mut mpsc::UnboundedReceiver<Observed>) -> Observed {
    tokio::time::timeout(Duration::from_secs(5), observed.recv())
        .await
        .expect("timed out waiting for callback")
        .expect("probe channel closed")
}

async fn accept(connections: &mut mpsc::UnboundedReceiver<ServerWs>) -> ServerWs {
    tokio::time::timeout(Duration::from_secs(5), connections.recv())
        .await
        .expect("timed out waiting for connection")
        .expect("server task stopped")
}

#[tokio::test]
async fn test_connect_dispatches_decoded_events() {
    let (url, mut connections) = spawn_server().await;
    let (mut client, mut observed) = socket(&url);
    client.connect();

    let mut server = accept(&mut connections).await;
    assert_eq!(recv(&mut observed).await, Observed::Connected);

    for frame in [
        serde_json::json!(["c", 5]),
        serde_json::json!(["u", [5, 4, 1]]),
        serde_json::json!(["e", [5, 1, [0, 4, 8]]]),
        serde_json::json!(["v", 42]),
    ] {
        server
            .send(Message::Text(frame.to_string().into()))
            .await
            .unwrap();
    }

    assert_eq!(recv(&mut observed).await, Observed::Created(5));
    assert_eq!(recv(&mut observed).await, Observed::Updated(5, 4, Piece::X));
    assert_eq!(
        recv(&mut observed).await,
        Observed::Ended(5, Outcome::Won(Piece::X))
    );
    assert_eq!(recv(&mut observed).await, Observed::Viewers(42));
    assert_eq!(client.status(), ConnectionStatus::Connected);
}

#[tokio::test]
async fn test_duplicate_connect_is_a_noop() {
    let (url, mut connections) = spawn_server().await;
    let (mut client, mut observed) = socket(&url);

    client.connect();
    let _server = accept(&mut connections).await;
    assert_eq!(recv(&mut observed).await, Observed::Connected);

    // A second connect while the driver is live must not open a second
    // socket.
    client.connect();
    tokio::time::sleep(Duration::from_millis(150)).await;
    assert!(connections.try_recv().is_err(), "a duplicate socket was opened");
}

#[tokio::test]
async fn test_reconnects_after_unrequested_close() {
    let (url, mut connections) = spawn_server().await;
    let (mut client, mut observed) = socket(&url);
    client.connect();

    let server = accept(&mut connections).await;
    assert_eq!(recv(&mut observed).await, Observed::Connected);

    // Server drops the connection without the client asking for it.
    drop(server);
    assert_eq!(recv(&mut observed).await, Observed::Disconnected);

    // The client must come back on its own.
    let mut server = accept(&mut connections).await;
    assert_eq!(recv(&mut observed).await, Observed::Connected);

    // And the new connection is fully functional.
    server
        .send(Message::Text(serde_json::json!(["c", 9]).to_string().into()))
        .await
        .unwrap();
    assert_eq!(recv(&mut observed).await, Observed::Created(9));
}

#[tokio::test]
async fn test_undecodable_frame_is_dropped_not_fatal() {
    let (url, mut connections) = spawn_server().await;
    let (mut client, mut observed) = socket(&url);
    client.connect();

    let mut server = accept(&mut connections).await;
    assert_eq!(recv(&mut observed).await, Observed::Connected);

    // Garbage, then a valid frame: the connection must survive the first
    // and deliver the second.
    server
        .send(Message::Text("not a frame".to_string().into()))
        .await
        .unwrap();
    server
        .send(Message::Text(serde_json::json!(["c", 3]).to_string().into()))
        .await
        .unwrap();

    assert_eq!(recv(&mut observed).await, Observed::Created(3));
}

#[tokio::test]
async fn test_disconnect_suppresses_reconnect() {
    let (url, mut connections) = spawn_server().await;
    let (mut client, mut observed) = socket(&url);
    client.connect();

    let server = accept(&mut connections).await;
    assert_eq!(recv(&mut observed).await, Observed::Connected);

    client.disconnect();
    assert_eq!(recv(&mut observed).await, Observed::Disconnected);
    drop(server);

    // No automatic recovery after an explicit disconnect.
    tokio::time::sleep(Duration::from_millis(250)).await;
    assert!(connections.try_recv().is_err(), "reconnected after disconnect()");
    assert!(!client.is_active());
    assert_eq!(client.status(), ConnectionStatus::Disconnected);
}

#[tokio::test]
async fn test_disconnect_cancels_pending_reconnect_timer() {
    // Bind a port, then drop the listener so every dial fails and the
    // driver sits in its backoff delay.
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let (tx, _rx) = mpsc::unbounded_channel();
    let mut client = RealtimeSocket::with_backoff(
        format!("ws://{addr}"),
        TaggedCodec,
        Probe { tx },
        BackoffConfig {
            floor: Duration::from_millis(300),
            step: Duration::from_millis(300),
            ceiling: Duration::from_secs(1),
        },
    );
    client.connect();

    // Let the first dial fail and the reconnect delay start.
    tokio::time::sleep(Duration::from_millis(100)).await;
    client.disconnect();

    // A listener comes back on the same port; a live driver would reach it
    // once the 300 ms delay fires.
    let listener = TcpListener::bind(addr).await.unwrap();
    let accepted = tokio::time::timeout(Duration::from_millis(600), listener.accept()).await;
    assert!(accepted.is_err(), "pending reconnect fired after disconnect()");
    assert!(!client.is_active());
}

#[tokio::test]
async fn test_connect_after_disconnect_starts_fresh() {
    let (url, mut connections) = spawn_server().await;
    let (mut client, mut observed) = socket(&url);

    client.connect();
    let _first = accept(&mut connections).await;
    assert_eq!(recv(&mut observed).await, Observed::Connected);

    client.disconnect();
    assert_eq!(recv(&mut observed).await, Observed::Disconnected);

    // The latch is cleared by a fresh connect().
    client.connect();
    let _second = accept(&mut connections).await;
    assert_eq!(recv(&mut observed).await, Observed::Connected);
}

#[tokio::test]
async fn test_outbound_commands_are_encoded_on_the_wire() {
    let (url, mut connections) = spawn_server().await;
    let (mut client, mut observed) = socket(&url);
    client.connect();

    let mut server = accept(&mut connections).await;
    assert_eq!(recv(&mut observed).await, Observed::Connected);

    client
        .send(ClientCommand::Move {
            game: GameId(0),
            board: BoardId(5),
            square: 4,
            piece: Piece::O,
        })
        .unwrap();

    let frame = tokio::time::timeout(Duration::from_secs(5), server.next())
        .await
        .expect("timed out")
        .unwrap()
        .unwrap();
    let value: serde_json::Value = serde_json::from_slice(&frame.into_data()).unwrap();
    assert_eq!(value, serde_json::json!(["m", [0, 5, 4, 2]]));
}

#[tokio::test]
async fn test_send_without_connect_is_rejected() {
    let (url, _connections) = spawn_server().await;
    let (client, _observed) = socket(&url);

    let result = client.send(ClientCommand::Emote { slug: "gg".into() });
    assert!(result.is_err());
}
