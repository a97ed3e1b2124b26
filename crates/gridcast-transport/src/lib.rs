//! Reconnecting realtime transport for Gridcast.
//!
//! [`RealtimeSocket`] turns an unreliable duplex WebSocket into a sequence
//! of typed domain events with two guarantees the rest of the client leans
//! on:
//!
//! - **At most one active connection.** A second `connect()` while a
//!   driver task is live is a logged no-op, never a duplicate socket.
//! - **Always eventually reconnect, unless told not to.** Any close or
//!   dial failure that was not preceded by an explicit `disconnect()`
//!   schedules a redial after the current [`Backoff`] delay; an explicit
//!   `disconnect()` latches the transport off until the next `connect()`.
//!
//! Decoded events are handed to a [`SocketEvents`] implementation,
//! sequentially, on the driver task. A frame that fails to decode is
//! dropped and logged; the connection stays open.

mod backoff;
mod error;
mod socket;

pub use backoff::{Backoff, BackoffConfig};
pub use error::TransportError;
pub use socket::{ConnectionStatus, RealtimeSocket, SocketEvents};
