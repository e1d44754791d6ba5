//! Room state and lifecycle for Knightwire.
//!
//! Every game lives in a [`Room`] behind its own lock, and every room is
//! owned by a [`RoomStore`]. The store also runs the deferred-deletion
//! timers that remove rooms nobody is attached to.
//!
//! # Key types
//!
//! - [`PositionValidator`]: the chess-rules seam; the room never interprets moves itself
//! - [`RoomStore`]: creates, finds, and deletes rooms
//! - [`Room`]: seats, move history, attached connections, identity bindings
//! - [`Peer`]: a connection as the room sees it (id, liveness, outbound queue)
//! - [`RoomConfig`]: grace window and code generation settings
//!
//! # Locking
//!
//! The store map and each room have separate `tokio::sync::Mutex`es. Code
//! that needs both always takes the map first.

mod config;
mod error;
mod peer;
mod room;
mod store;
mod validator;

pub use config::RoomConfig;
pub use error::RoomError;
pub use peer::{OUTBOUND_CAPACITY, Outbound, Peer};
pub use room::{Detached, JoinOutcome, Room};
pub use store::{RoomStore, SharedRoom};
pub use validator::PositionValidator;
