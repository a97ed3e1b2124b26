//! Terminal viewer: connects to a Gridcast service and logs every state
//! transition. Useful for watching a deployment without a browser.
//!
//! ```text
//! viewer ws://127.0.0.1:8080
//! RUST_LOG=gridcast=debug viewer   # reads GRIDCAST_URL when no arg given
//! ```

use gridcast::{ClientConfig, ConnectionStatus, TaggedCodec, ViewerClient};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let url = std::env::args()
        .nth(1)
        .or_else(|| std::env::var("GRIDCAST_URL").ok())
        .unwrap_or_else(|| "ws://127.0.0.1:8080".to_string());

    tracing::info!(%url, "starting viewer");

    let mut client = ViewerClient::new(ClientConfig::new(url), TaggedCodec);
    let mut snapshots = client.subscribe();
    client.connect();

    let mut last_connection = ConnectionStatus::Disconnected;
    while snapshots.changed().await.is_ok() {
        let snapshot = snapshots.borrow().clone();

        if snapshot.connection != last_connection {
            tracing::info!(connection = %snapshot.connection, "connection changed");
            last_connection = snapshot.connection;
        }

        for (slot, board) in &snapshot.boards {
            tracing::debug!(
                slot,
                board = %board.id,
                finished = board.is_finished(),
                "board state"
            );
        }
        tracing::info!(
            boards = snapshot.boards.len(),
            games = snapshot.games.len(),
            viewers = snapshot.viewer_count,
            "snapshot"
        );
    }

    Ok(())
}
