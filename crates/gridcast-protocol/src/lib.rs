//! Wire protocol for Gridcast.
//!
//! This crate defines the "language" spoken between a Gridcast client and a
//! many-board tic-tac-toe server:
//!
//! - **Types** ([`ServerEvent`], [`ClientCommand`], [`Board`], [`Game`]) —
//!   the decoded domain representation of what travels on the wire.
//! - **Codecs** ([`WireCodec`] trait, [`PackedCodec`], [`TaggedCodec`]) —
//!   the two deployed wire shapes and how each converts to/from bytes.
//! - **Errors** ([`ProtocolError`]) — what can go wrong while encoding or
//!   decoding a single frame.
//!
//! # Architecture
//!
//! The protocol layer sits between transport (raw frames) and state
//! (slot map). It knows nothing about sockets or reconnection; it only
//! turns bytes into typed events and commands into bytes.
//!
//! ```text
//! Transport (bytes) → Protocol (ServerEvent) → State (slot map)
//! ```

mod codec;
mod error;
mod types;

#[cfg(feature = "packed")]
pub use codec::PackedCodec;
pub use codec::{TaggedCodec, WireCodec};
pub use error::ProtocolError;
pub use types::{
    Board, BoardId, Cell, ClientCommand, Game, GameId, Outcome, Piece,
    ServerEvent,
};
