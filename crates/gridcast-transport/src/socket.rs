//! The reconnecting WebSocket client.
//!
//! One driver task owns the physical socket at any time. The public
//! surface never exposes the socket itself, only callback registration
//! (via [`SocketEvents`]) and an outbound command channel.

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

use futures_util::{SinkExt, StreamExt};
use gridcast_protocol::{
    BoardId, Cell, ClientCommand, Game, Outcome, Piece, ServerEvent, WireCodec,
};
use tokio::sync::{mpsc, watch, Mutex};
use tokio_tungstenite::tungstenite::Message;

use crate::{Backoff, BackoffConfig, TransportError};

type WsStream = tokio_tungstenite::WebSocketStream<
    tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>,
>;

// ---------------------------------------------------------------------------
// Callback surface
// ---------------------------------------------------------------------------

/// Receiver of decoded transport events.
///
/// Every method is invoked at most once per wire event, synchronously on
/// the driver task, in the order the network delivered the frames. There
/// is no reordering buffer: an update that arrives before its create is
/// delivered as-is (the state layer treats it as a benign no-op).
pub trait SocketEvents: Send + 'static {
    /// A new board started.
    fn on_create(&mut self, board: BoardId);

    /// One square of a board changed.
    fn on_update(&mut self, board: BoardId, position: usize, piece: Piece);

    /// A board reached its outcome.
    fn on_end(
        &mut self,
        board: BoardId,
        outcome: Outcome,
        winning_line: Option<[usize; 3]>,
    );

    /// Full-position variant of an update. Default: ignored.
    fn on_snapshot(&mut self, _board: BoardId, _positions: [Cell; 9]) {}

    /// The whole game reached its outcome. Default: ignored.
    fn on_game_end(&mut self, _outcome: Outcome, _winning_line: Option<Vec<usize>>) {}

    /// The connected-viewer count changed. Default: ignored.
    fn on_viewer_count(&mut self, _count: u64) {}

    /// A hydration snapshot of games arrived. Default: ignored.
    fn on_history(&mut self, _games: Vec<Game>) {}

    /// A username-registration acknowledgement arrived. Default: ignored.
    fn on_ack(&mut self, _code: u16, _message: String) {}

    /// The socket opened (initial connect or a successful reconnect).
    fn on_connected(&mut self) {}

    /// The socket closed. A reconnect follows unless one was requested.
    fn on_disconnected(&mut self) {}
}

/// Routes one decoded event to the matching callback.
fn dispatch<H: SocketEvents>(handler: &mut H, event: ServerEvent) {
    match event {
        ServerEvent::BoardCreated { board } => handler.on_create(board),
        ServerEvent::BoardUpdated {
            board,
            position,
            piece,
        } => handler.on_update(board, position, piece),
        ServerEvent::BoardSnapshot { board, positions } => {
            handler.on_snapshot(board, positions);
        }
        ServerEvent::BoardEnded {
            board,
            outcome,
            winning_line,
        } => handler.on_end(board, outcome, winning_line),
        ServerEvent::GameEnded {
            outcome,
            winning_line,
        } => handler.on_game_end(outcome, winning_line),
        ServerEvent::ViewerCount { count } => handler.on_viewer_count(count),
        ServerEvent::History { games } => handler.on_history(games),
        ServerEvent::Ack { code, message } => handler.on_ack(code, message),
    }
}

// ---------------------------------------------------------------------------
// Connection status
// ---------------------------------------------------------------------------

/// Lifecycle state of the one managed connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionStatus {
    Disconnected,
    Connecting,
    Connected,
}

impl ConnectionStatus {
    fn as_u8(self) -> u8 {
        match self {
            Self::Disconnected => 0,
            Self::Connecting => 1,
            Self::Connected => 2,
        }
    }

    fn from_u8(value: u8) -> Self {
        match value {
            2 => Self::Connected,
            1 => Self::Connecting,
            _ => Self::Disconnected,
        }
    }
}

impl std::fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Disconnected => write!(f, "disconnected"),
            Self::Connecting => write!(f, "connecting"),
            Self::Connected => write!(f, "connected"),
        }
    }
}

// ---------------------------------------------------------------------------
// RealtimeSocket
// ---------------------------------------------------------------------------

/// State shared between the handle and the driver task.
struct Shared<C, H> {
    url: String,
    codec: C,
    handler: Mutex<H>,
    status: AtomicU8,
}

impl<C, H> Shared<C, H> {
    fn set_status(&self, status: ConnectionStatus) {
        self.status.store(status.as_u8(), Ordering::SeqCst);
    }
}

/// A reconnecting realtime client socket.
///
/// The same configured URL is redialed on every reconnect; there is no
/// failover to alternate hosts.
pub struct RealtimeSocket<C: WireCodec, H: SocketEvents> {
    shared: Arc<Shared<C, H>>,
    backoff: BackoffConfig,
    /// `true` latches the reconnect path off. Cleared only by `connect()`.
    shutdown_tx: watch::Sender<bool>,
    command_tx: Option<mpsc::UnboundedSender<ClientCommand>>,
    driver: Option<tokio::task::JoinHandle<()>>,
}

impl<C: WireCodec, H: SocketEvents> RealtimeSocket<C, H> {
    /// Creates a socket for `url`. No connection is opened until
    /// [`connect`](Self::connect).
    pub fn new(url: impl Into<String>, codec: C, handler: H) -> Self {
        Self::with_backoff(url, codec, handler, BackoffConfig::default())
    }

    /// Creates a socket with custom reconnect timing.
    pub fn with_backoff(
        url: impl Into<String>,
        codec: C,
        handler: H,
        backoff: BackoffConfig,
    ) -> Self {
        let (shutdown_tx, _) = watch::channel(false);
        Self {
            shared: Arc::new(Shared {
                url: url.into(),
                codec,
                handler: Mutex::new(handler),
                status: AtomicU8::new(ConnectionStatus::Disconnected.as_u8()),
            }),
            backoff,
            shutdown_tx,
            command_tx: None,
            driver: None,
        }
    }

    /// Opens the connection and starts the reconnect loop.
    ///
    /// Idempotent-connect guard: if a driver task is already live this is
    /// a logged no-op; there is never a second concurrent socket. A fresh
    /// call after [`disconnect`](Self::disconnect) clears the latch and
    /// starts over.
    pub fn connect(&mut self) {
        if self.is_active() {
            tracing::debug!(url = %self.shared.url, "connect ignored: socket already active");
            return;
        }

        let _ = self.shutdown_tx.send(false);
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        self.command_tx = Some(command_tx);

        let shared = Arc::clone(&self.shared);
        let shutdown_rx = self.shutdown_tx.subscribe();
        let backoff = Backoff::new(self.backoff.clone());
        self.driver = Some(tokio::spawn(drive(
            shared,
            shutdown_rx,
            command_rx,
            backoff,
        )));
    }

    /// Requests disconnection.
    ///
    /// Sets the disconnect latch and closes the socket. The latch also
    /// cancels a scheduled-but-unfired reconnect delay, so no further
    /// connection attempt happens until the next `connect()`.
    pub fn disconnect(&self) {
        let _ = self.shutdown_tx.send(true);
    }

    /// Queues one command for transmission on the open connection.
    ///
    /// # Errors
    /// Returns [`TransportError::NotConnected`] if no driver task is
    /// running (never connected, or disconnected).
    pub fn send(&self, command: ClientCommand) -> Result<(), TransportError> {
        self.command_tx
            .as_ref()
            .filter(|_| self.is_active())
            .ok_or(TransportError::NotConnected)?
            .send(command)
            .map_err(|_| TransportError::NotConnected)
    }

    /// Whether a driver task currently owns the connection lifecycle.
    pub fn is_active(&self) -> bool {
        self.driver.as_ref().is_some_and(|task| !task.is_finished())
    }

    /// Current connection lifecycle state.
    pub fn status(&self) -> ConnectionStatus {
        ConnectionStatus::from_u8(self.shared.status.load(Ordering::SeqCst))
    }
}

impl<C: WireCodec, H: SocketEvents> Drop for RealtimeSocket<C, H> {
    fn drop(&mut self) {
        // The driver must not outlive its handle and reconnect forever.
        self.disconnect();
    }
}

// ---------------------------------------------------------------------------
// Driver task
// ---------------------------------------------------------------------------

/// Why one connection cycle ended.
enum CycleEnd {
    /// The peer closed or the socket failed; retry after backoff.
    Lost,
    /// `disconnect()` was requested; stop for good.
    Requested,
}

async fn drive<C: WireCodec, H: SocketEvents>(
    shared: Arc<Shared<C, H>>,
    mut shutdown_rx: watch::Receiver<bool>,
    mut command_rx: mpsc::UnboundedReceiver<ClientCommand>,
    mut backoff: Backoff,
) {
    loop {
        if *shutdown_rx.borrow() {
            break;
        }

        shared.set_status(ConnectionStatus::Connecting);
        tracing::debug!(url = %shared.url, "connecting");

        match dial(&shared.url).await {
            Ok(stream) => {
                // Successful open: the delay counter goes back to its floor.
                backoff.reset();
                shared.set_status(ConnectionStatus::Connected);
                shared.handler.lock().await.on_connected();

                let end = run_connection(
                    &shared,
                    stream,
                    &mut shutdown_rx,
                    &mut command_rx,
                )
                .await;

                shared.set_status(ConnectionStatus::Disconnected);
                shared.handler.lock().await.on_disconnected();

                if matches!(end, CycleEnd::Requested) {
                    break;
                }
                tracing::info!(url = %shared.url, "connection closed without being requested, reconnecting");
            }
            Err(error) => {
                shared.set_status(ConnectionStatus::Disconnected);
                tracing::warn!(url = %shared.url, %error, "dial failed");
            }
        }

        if *shutdown_rx.borrow() {
            break;
        }

        let delay = backoff.next_delay();
        tracing::debug!(delay_ms = delay.as_millis() as u64, "reconnect scheduled");
        tokio::select! {
            () = tokio::time::sleep(delay) => {}
            // A disconnect during the pending delay cancels the reconnect.
            _ = shutdown_rx.wait_for(|&requested| requested) => break,
        }
    }

    shared.set_status(ConnectionStatus::Disconnected);
    tracing::debug!(url = %shared.url, "socket driver stopped");
}

async fn dial(url: &str) -> Result<WsStream, TransportError> {
    let (stream, _response) = tokio_tungstenite::connect_async(url)
        .await
        .map_err(TransportError::Dial)?;
    Ok(stream)
}

/// Services one open connection until it closes, fails, or is told to stop.
async fn run_connection<C: WireCodec, H: SocketEvents>(
    shared: &Shared<C, H>,
    stream: WsStream,
    shutdown_rx: &mut watch::Receiver<bool>,
    command_rx: &mut mpsc::UnboundedReceiver<ClientCommand>,
) -> CycleEnd {
    let (mut sink, mut source) = stream.split();

    loop {
        tokio::select! {
            // The async block drops the non-Send watch guard before the
            // branch body awaits, keeping the driver future Send.
            _ = async { let _ = shutdown_rx.wait_for(|&requested| requested).await; } => {
                let _ = sink.send(Message::Close(None)).await;
                return CycleEnd::Requested;
            }

            command = command_rx.recv() => {
                let Some(command) = command else {
                    // Every handle is gone; nobody is left to reconnect for.
                    let _ = sink.send(Message::Close(None)).await;
                    return CycleEnd::Requested;
                };
                match shared.codec.encode(&command) {
                    Ok(bytes) => {
                        if let Err(error) = sink.send(Message::Binary(bytes.into())).await {
                            tracing::warn!(%error, "send failed");
                            return CycleEnd::Lost;
                        }
                    }
                    Err(error) => {
                        tracing::warn!(%error, ?command, "dropping unencodable command");
                    }
                }
            }

            frame = source.next() => {
                match frame {
                    Some(Ok(Message::Binary(data))) => {
                        handle_frame(shared, &data).await;
                    }
                    Some(Ok(Message::Text(text))) => {
                        handle_frame(shared, text.as_bytes()).await;
                    }
                    Some(Ok(Message::Close(_))) | None => return CycleEnd::Lost,
                    Some(Ok(_)) => {} // ping/pong/frame
                    Some(Err(error)) => {
                        // Log only; the resulting close drives recovery.
                        tracing::warn!(%error, "socket error");
                        return CycleEnd::Lost;
                    }
                }
            }
        }
    }
}

/// Decodes and dispatches one frame. A malformed frame is dropped here
/// and never reaches the handler.
async fn handle_frame<C: WireCodec, H: SocketEvents>(shared: &Shared<C, H>, data: &[u8]) {
    match shared.codec.decode(data) {
        Ok(event) => dispatch(&mut *shared.handler.lock().await, event),
        Err(error) => {
            tracing::warn!(%error, frame_len = data.len(), "dropping undecodable frame");
        }
    }
}

// =========================================================================
// Tests
// =========================================================================
