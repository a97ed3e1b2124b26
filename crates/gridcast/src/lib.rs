//! # Gridcast
//!
//! Live-updating viewer client for the Gridcast many-board service.
//!
//! The service runs a continuous stream of tic-tac-toe boards; this crate
//! connects to it, keeps a bounded set of boards current through every
//! disconnect, and lets the caller submit moves. The pieces:
//!
//! - `gridcast-protocol` decodes wire frames into typed events, with the
//!   wire strategy ([`PackedCodec`] or [`TaggedCodec`]) chosen at
//!   construction.
//! - `gridcast-transport` owns the WebSocket and its reconnect loop.
//! - `gridcast-state` reduces events into a bounded slot map.
//! - This crate ties them together behind [`ViewerClient`], publishing
//!   every state transition as a [`ViewerSnapshot`] over a watch channel.
//!
//! ```rust,no_run
//! use gridcast::{ClientConfig, TaggedCodec, ViewerClient};
//!
//! # async fn run() {
//! let mut client = ViewerClient::new(
//!     ClientConfig::new("wss://example.org/live"),
//!     TaggedCodec,
//! );
//! let mut snapshots = client.subscribe();
//! client.connect();
//!
//! while snapshots.changed().await.is_ok() {
//!     let snapshot = snapshots.borrow().clone();
//!     println!("{} boards live", snapshot.boards.len());
//! }
//! # }
//! ```

mod client;
mod error;

pub use client::{ClientConfig, ViewerClient, ViewerSnapshot, DEFAULT_CAPACITY};
pub use error::GridcastError;

pub use gridcast_protocol::{
    Board, BoardId, Cell, ClientCommand, Game, GameId, Outcome, Piece, ServerEvent, TaggedCodec,
    WireCodec,
};
#[cfg(feature = "packed")]
pub use gridcast_protocol::PackedCodec;
pub use gridcast_state::SlotMap;
pub use gridcast_transport::{BackoffConfig, ConnectionStatus};
