//! The viewer client: transport events in, published snapshots out.
//!
//! [`ViewerClient`] wires the reconnecting socket into the slot reducer
//! and publishes the resulting state over a `tokio::sync::watch` channel.
//! Consumers never see a half-applied transition: every wire event
//! produces one new [`ViewerSnapshot`], and each snapshot is a
//! structurally distinct value.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use gridcast_protocol::{
    BoardId, Cell, ClientCommand, Game, GameId, Outcome, Piece, WireCodec,
};
use gridcast_state::{reduce, BoardsAction, GameExt, SlotAllocator, SlotMap};
use gridcast_transport::{BackoffConfig, ConnectionStatus, RealtimeSocket, SocketEvents};
use tokio::sync::watch;

use crate::GridcastError;

/// Display slots available when the config does not say otherwise.
pub const DEFAULT_CAPACITY: usize = 9;

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Construction-time settings for [`ViewerClient`].
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// WebSocket URL of the service.
    pub url: String,
    /// How many boards are on display at once.
    pub capacity: usize,
    /// Reconnect timing.
    pub backoff: BackoffConfig,
}

impl ClientConfig {
    /// Config for `url` with [`DEFAULT_CAPACITY`] and default backoff.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            capacity: DEFAULT_CAPACITY,
            backoff: BackoffConfig::default(),
        }
    }
}

// ---------------------------------------------------------------------------
// Snapshot
// ---------------------------------------------------------------------------

/// One published view of everything the client currently knows.
#[derive(Debug, Clone, PartialEq)]
pub struct ViewerSnapshot {
    /// The live boards, keyed by display slot.
    pub boards: SlotMap,
    /// Hydrated game history; the last entry is the game in progress.
    pub games: Vec<Game>,
    pub connection: ConnectionStatus,
    pub viewer_count: u64,
}

impl ViewerSnapshot {
    fn empty() -> Self {
        Self {
            boards: SlotMap::new(),
            games: Vec::new(),
            connection: ConnectionStatus::Disconnected,
            viewer_count: 0,
        }
    }

    /// The game currently in progress, if history has arrived.
    pub fn current_game(&self) -> Option<&Game> {
        self.games.last()
    }
}

// ---------------------------------------------------------------------------
// Socket handler
// ---------------------------------------------------------------------------

/// Owns the mutable state; lives on the socket driver task.
struct StateHandler {
    boards: SlotMap,
    allocator: SlotAllocator,
    capacity: Arc<AtomicUsize>,
    games: Vec<Game>,
    connection: ConnectionStatus,
    viewer_count: u64,
    updates: watch::Sender<ViewerSnapshot>,
}

impl StateHandler {
    fn apply(&mut self, action: BoardsAction) {
        self.boards = reduce(&self.boards, &mut self.allocator, action);
    }

    fn publish(&self) {
        self.updates.send_replace(ViewerSnapshot {
            boards: self.boards.clone(),
            games: self.games.clone(),
            connection: self.connection,
            viewer_count: self.viewer_count,
        });
    }
}

impl SocketEvents for StateHandler {
    fn on_create(&mut self, board: BoardId) {
        let capacity = self.capacity.load(Ordering::Relaxed);
        self.apply(BoardsAction::Create { board, capacity });
        self.publish();
    }

    fn on_update(&mut self, board: BoardId, position: usize, piece: Piece) {
        self.apply(BoardsAction::UpdateSquare {
            board,
            position,
            piece,
        });
        self.publish();
    }

    fn on_snapshot(&mut self, board: BoardId, positions: [Cell; 9]) {
        self.apply(BoardsAction::Snapshot { board, positions });
        self.publish();
    }

    fn on_end(&mut self, board: BoardId, outcome: Outcome, winning_line: Option<[usize; 3]>) {
        self.apply(BoardsAction::EndBoard {
            board,
            outcome,
            winning_line,
        });
        // The current game aggregate tracks per-board ends too, so a
        // finished board stays known even after its slot is reused.
        if let Some(game) = self.games.last_mut() {
            game.end_board(board, outcome, winning_line);
        }
        self.publish();
    }

    fn on_game_end(&mut self, outcome: Outcome, winning_line: Option<Vec<usize>>) {
        match self.games.last_mut() {
            Some(game) => game.finish(outcome, winning_line, None),
            None => tracing::debug!("game end before any history, nothing to finish"),
        }
        self.publish();
    }

    fn on_viewer_count(&mut self, count: u64) {
        self.viewer_count = count;
        self.publish();
    }

    fn on_ack(&mut self, code: u16, message: String) {
        tracing::debug!(code, %message, "username registration answered");
    }

    fn on_history(&mut self, games: Vec<Game>) {
        // Hydrate the display from the game in progress.
        self.boards = match games.last() {
            Some(game) => reduce(
                &self.boards,
                &mut self.allocator,
                BoardsAction::Initialize { game: game.clone() },
            ),
            None => SlotMap::new(),
        };
        self.games = games;
        self.publish();
    }

    fn on_connected(&mut self) {
        // Fresh connection epoch. The server re-sends history after every
        // open, so stale boards from the previous epoch are dropped here.
        self.apply(BoardsAction::Reset);
        self.connection = ConnectionStatus::Connected;
        self.publish();
    }

    fn on_disconnected(&mut self) {
        self.connection = ConnectionStatus::Disconnected;
        self.publish();
    }
}

// ---------------------------------------------------------------------------
// ViewerClient
// ---------------------------------------------------------------------------

/// A live-updating viewer of the many-board service.
///
/// The wire strategy is fixed at construction: pass
/// [`PackedCodec`](gridcast_protocol::PackedCodec) or
/// [`TaggedCodec`](gridcast_protocol::TaggedCodec) depending on the
/// deployment being talked to.
pub struct ViewerClient<C: WireCodec> {
    socket: RealtimeSocket<C, StateHandler>,
    snapshots: watch::Receiver<ViewerSnapshot>,
    capacity: Arc<AtomicUsize>,
}

impl<C: WireCodec> ViewerClient<C> {
    /// Builds a client. No connection is opened until
    /// [`connect`](Self::connect).
    pub fn new(config: ClientConfig, codec: C) -> Self {
        let capacity = Arc::new(AtomicUsize::new(config.capacity));
        let (updates, snapshots) = watch::channel(ViewerSnapshot::empty());
        let handler = StateHandler {
            boards: SlotMap::new(),
            allocator: SlotAllocator::new(),
            capacity: Arc::clone(&capacity),
            games: Vec::new(),
            connection: ConnectionStatus::Disconnected,
            viewer_count: 0,
            updates,
        };
        let socket = RealtimeSocket::with_backoff(config.url, codec, handler, config.backoff);
        Self {
            socket,
            snapshots,
            capacity,
        }
    }

    /// Opens the connection; reconnects automatically until
    /// [`disconnect`](Self::disconnect).
    pub fn connect(&mut self) {
        self.socket.connect();
    }

    /// Closes the connection and suppresses reconnection.
    pub fn disconnect(&self) {
        self.socket.disconnect();
    }

    /// Current connection lifecycle state.
    pub fn status(&self) -> ConnectionStatus {
        self.socket.status()
    }

    /// A copy of the latest published snapshot.
    pub fn snapshot(&self) -> ViewerSnapshot {
        self.snapshots.borrow().clone()
    }

    /// A receiver that observes every snapshot transition.
    pub fn subscribe(&self) -> watch::Receiver<ViewerSnapshot> {
        self.snapshots.clone()
    }

    /// Changes the number of display slots used for subsequent creates.
    ///
    /// Existing slots are not renumbered; the new modulus only affects
    /// boards created from now on.
    pub fn set_capacity(&self, capacity: usize) {
        self.capacity.store(capacity, Ordering::Relaxed);
    }

    /// Submits a move after validating it against the local state.
    ///
    /// # Errors
    /// Rejects the move locally, without touching the wire, if the square
    /// index is out of range, the board is not on display, the board has
    /// finished (by its own winner or the current game's record of it),
    /// or the square is occupied.
    pub fn submit_move(
        &self,
        game: GameId,
        board: BoardId,
        square: usize,
        piece: Piece,
    ) -> Result<(), GridcastError> {
        if square >= 9 {
            return Err(GridcastError::InvalidSquare(square));
        }
        {
            let snapshot = self.snapshots.borrow();
            let entry = snapshot
                .boards
                .values()
                .find(|candidate| candidate.id == board)
                .ok_or(GridcastError::UnknownBoard(board))?;
            let announced_ended = snapshot
                .current_game()
                .is_some_and(|current| current.ended_boards().contains(&board));
            if entry.is_finished() || announced_ended {
                return Err(GridcastError::BoardFinished(board));
            }
            if entry.positions[square].is_some() {
                return Err(GridcastError::SquareOccupied { board, square });
            }
        }
        self.socket.send(ClientCommand::Move {
            game,
            board,
            square,
            piece,
        })?;
        Ok(())
    }

    /// Registers a display name; answered by an ack event.
    ///
    /// # Errors
    /// Rejects a blank name locally.
    pub fn request_username(&self, username: impl Into<String>) -> Result<(), GridcastError> {
        let username = username.into();
        if username.trim().is_empty() {
            return Err(GridcastError::EmptyUsername);
        }
        self.socket.send(ClientCommand::RequestUsername { username })?;
        Ok(())
    }

    /// Sends an emote by slug. Fire-and-forget.
    pub fn send_emote(&self, slug: impl Into<String>) -> Result<(), GridcastError> {
        self.socket.send(ClientCommand::Emote { slug: slug.into() })?;
        Ok(())
    }
}

// =========================================================================
// Tests
// =========================================================================
