//! End-to-end tests: wire frames in, snapshots and validated moves out.

use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use gridcast::{
    BackoffConfig, BoardId, ClientConfig, GameId, GridcastError, Outcome, Piece, TaggedCodec,
    ViewerClient, ViewerSnapshot,
};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{mpsc, watch};
use tokio_tungstenite::tungstenite::Message;

type ServerWs = tokio_tungstenite::WebSocketStream<TcpStream>;

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

fn client(url: &str, capacity: usize) -> ViewerClient<TaggedCodec> {
    let config = ClientConfig {
        url: url.to_string(),
        capacity,
        backoff: BackoffConfig {
            floor: Duration::from_millis(30),
            step: Duration::from_millis(30),
            ceiling: Duration::from_millis(200),
        },
    };
    ViewerClient::new(config, TaggedCodec)
}

async fn accept(connections: &mut mpsc::UnboundedReceiver<ServerWs>) -> ServerWs {
    tokio::time::timeout(Duration::from_secs(5), connections.recv())
        .await
        .expect("timed out waiting for connection")
        .expect("server task stopped")
}

async fn send_frame(server: &mut ServerWs, frame: serde_json::Value) {
    server
        .send(Message::Text(frame.to_string().into()))
        .await
        .unwrap();
}

/// Waits until the published snapshot satisfies `predicate`.
async fn wait_for(
    snapshots: &mut watch::Receiver<ViewerSnapshot>,
    predicate: impl FnMut(&ViewerSnapshot) -> bool,
) -> ViewerSnapshot {
    tokio::time::timeout(Duration::from_secs(5), snapshots.wait_for(predicate))
        .await
        .expect("timed out waiting for snapshot")
        .expect("snapshot channel closed")
        .clone()
}

fn history_frame() -> serde_json::Value {
    serde_json::json!(["h", [{
        "id": 1,
        "boards": [
            {"id": 10, "positions": [0, 0, 0, 0, 0, 0, 0, 0, 0]},
            {"id": 20, "positions": [1, 0, 0, 0, 0, 0, 0, 0, 0]},
        ],
        "nextPiece": 2
    }]])
}

#[tokio::test]
async fn test_board_lifecycle_reaches_the_snapshot() {
    let (url, mut connections) = spawn_server().await;
    let mut viewer = client(&url, 4);
    let mut snapshots = viewer.subscribe();
    viewer.connect();

    let mut server = accept(&mut connections).await;
    send_frame(&mut server, serde_json::json!(["c", 5])).await;
    send_frame(&mut server, serde_json::json!(["u", [5, 4, 1]])).await;
    send_frame(&mut server, serde_json::json!(["e", [5, 1, [0, 4, 8]]])).await;

    let snapshot = wait_for(&mut snapshots, |s| {
        s.boards.values().any(|b| b.id == BoardId(5) && b.winner.is_some())
    })
    .await;

    let board = snapshot.boards.values().find(|b| b.id == BoardId(5)).unwrap();
    assert_eq!(board.positions[4], Some(Piece::X));
    assert_eq!(board.winner, Some(Outcome::Won(Piece::X)));
    assert_eq!(board.winning_line, Some([0, 4, 8]));
}

#[tokio::test]
async fn test_history_then_game_end() {
    let (url, mut connections) = spawn_server().await;
    let mut viewer = client(&url, 4);
    let mut snapshots = viewer.subscribe();
    viewer.connect();

    let mut server = accept(&mut connections).await;
    send_frame(&mut server, history_frame()).await;

    let snapshot = wait_for(&mut snapshots, |s| !s.games.is_empty()).await;
    assert_eq!(snapshot.boards.len(), 2);
    assert_eq!(snapshot.boards[&1].positions[0], Some(Piece::X));

    send_frame(&mut server, serde_json::json!(["e", [null, 2, [0, 1, 2]]])).await;

    let snapshot = wait_for(&mut snapshots, |s| {
        s.current_game().is_some_and(|g| g.winner.is_some())
    })
    .await;
    let game = snapshot.current_game().unwrap();
    assert_eq!(game.winner, Some(Outcome::Won(Piece::O)));
    assert_eq!(game.winning_line, Some(vec![0, 1, 2]));
}

#[tokio::test]
async fn test_viewer_count_updates() {
    let (url, mut connections) = spawn_server().await;
    let mut viewer = client(&url, 4);
    let mut snapshots = viewer.subscribe();
    viewer.connect();

    let mut server = accept(&mut connections).await;
    send_frame(&mut server, serde_json::json!(["v", 1523])).await;

    let snapshot = wait_for(&mut snapshots, |s| s.viewer_count == 1523).await;
    assert_eq!(snapshot.viewer_count, 1523);
}

#[tokio::test]
async fn test_valid_move_is_sent_invalid_moves_are_not() {
    let (url, mut connections) = spawn_server().await;
    let mut viewer = client(&url, 4);
    let mut snapshots = viewer.subscribe();
    viewer.connect();

    let mut server = accept(&mut connections).await;
    send_frame(&mut server, history_frame()).await;
    send_frame(&mut server, serde_json::json!(["e", [10, 0, []]])).await;
    wait_for(&mut snapshots, |s| {
        s.boards.values().any(|b| b.id == BoardId(10) && b.winner.is_some())
    })
    .await;

    // Board 20 has X on square 0 from history.
    let occupied = viewer.submit_move(GameId(1), BoardId(20), 0, Piece::O);
    assert!(matches!(occupied, Err(GridcastError::SquareOccupied { .. })));

    let finished = viewer.submit_move(GameId(1), BoardId(10), 0, Piece::O);
    assert!(matches!(finished, Err(GridcastError::BoardFinished(_))));

    let unknown = viewer.submit_move(GameId(1), BoardId(99), 0, Piece::O);
    assert!(matches!(unknown, Err(GridcastError::UnknownBoard(_))));

    // Only the valid move reaches the server.
    viewer.submit_move(GameId(1), BoardId(20), 4, Piece::O).unwrap();
    let frame = tokio::time::timeout(Duration::from_secs(5), server.next())
        .await
        .expect("timed out")
        .unwrap()
        .unwrap();
    let value: serde_json::Value = serde_json::from_slice(&frame.into_data()).unwrap();
    assert_eq!(value, serde_json::json!(["m", [1, 20, 4, 2]]));
}

#[tokio::test]
async fn test_reconnect_resets_the_display_epoch() {
    let (url, mut connections) = spawn_server().await;
    let mut viewer = client(&url, 4);
    let mut snapshots = viewer.subscribe();
    viewer.connect();

    let mut server = accept(&mut connections).await;
    send_frame(&mut server, serde_json::json!(["c", 5])).await;
    wait_for(&mut snapshots, |s| !s.boards.is_empty()).await;

    // The server drops the connection; the client reconnects and the old
    // boards are gone until fresh state arrives.
    drop(server);
    let _server = accept(&mut connections).await;

    let snapshot = wait_for(&mut snapshots, |s| {
        s.connection == gridcast::ConnectionStatus::Connected && s.boards.is_empty()
    })
    .await;
    assert!(snapshot.boards.is_empty());
}
