//! Unified error type for the viewer client.

use gridcast_protocol::{BoardId, ProtocolError};
use gridcast_transport::TransportError;

/// Top-level error that wraps the sub-crate errors and adds the local
/// move-validation failures.
///
/// When using the `gridcast` facade, you deal with this single error type
/// instead of importing errors from each sub-crate. The `#[from]`
/// attribute on the wrapper variants auto-generates `From` impls, so the
/// `?` operator converts sub-crate errors automatically.
///
/// Validation variants are produced locally, before anything is sent to
/// the wire.
#[derive(Debug, thiserror::Error)]
pub enum GridcastError {
    /// A transport-level error (not connected, dial failure).
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A protocol-level error (encode, decode, malformed frame).
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// The referenced board is not on display.
    #[error("board {0} is not on display")]
    UnknownBoard(BoardId),

    /// The referenced board has already reached its outcome.
    #[error("board {0} has already finished")]
    BoardFinished(BoardId),

    /// The targeted square is already occupied.
    #[error("square {square} on board {board} is occupied")]
    SquareOccupied { board: BoardId, square: usize },

    /// The square index is outside `0..9`.
    #[error("square index {0} is out of range")]
    InvalidSquare(usize),

    /// A username registration was attempted with a blank name.
    #[error("username must not be empty")]
    EmptyUsername,
}
