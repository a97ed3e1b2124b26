//! Board-state reconciliation for Gridcast.
//!
//! This crate folds the decoded event stream into a capacity-bounded
//! collection of boards:
//!
//! - [`SlotAllocator`] — assigns each newly created board to a display
//!   slot in strict round-robin order.
//! - [`reduce`] — the pure state-transition function from a slot map and
//!   one [`BoardsAction`] to the next slot map.
//! - [`GameExt`] — in-place mutation helpers for the [`Game`] aggregate.
//!
//! Nothing here touches the network. The reducer is total: any action
//! against any map produces a map, never a panic, and stale references
//! degrade to no-ops.

mod allocator;
mod game;
mod reducer;

pub use allocator::SlotAllocator;
pub use game::GameExt;
pub use reducer::{reduce, BoardsAction, SlotMap};

#[doc(no_inline)]
pub use gridcast_protocol::Game;
