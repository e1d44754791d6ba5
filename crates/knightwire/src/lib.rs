//! # Knightwire
//!
//! Real-time relay for two-player chess rooms.
//!
//! Clients create a room, join it over a WebSocket with an opaque player
//! identity, and submit moves. Every accepted move is broadcast to the
//! whole room with the full history. Players who drop can come back with
//! the same identity and get their seat and the history back. Rooms that
//! sit empty for the grace window are deleted.
//!
//! Chess rules are not built in: implement [`PositionValidator`] for the
//! rules engine of your choice.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use knightwire::prelude::*;
//!
//! # struct MyRules;
//! # impl PositionValidator for MyRules {
//! #     type Position = ();
//! #     fn initial() {}
//! #     fn apply(_: &(), _: &MoveDescriptor) -> Result<(), String> { Ok(()) }
//! # }
//! # async fn start() -> Result<(), KnightwireError> {
//! let server = KnightwireServerBuilder::new()
//!     .bind("0.0.0.0:3001")
//!     .build::<MyRules>()
//!     .await?;
//! let handle = server.handle();
//! let created = handle.create_game(CreateGameRequest::default()).await?;
//! println!("join with code {}", created.game_code);
//! server.run().await
//! # }
//! ```

mod error;
mod handler;
pub mod logging;
mod server;

pub use error::KnightwireError;
pub use server::{KnightwireServer, KnightwireServerBuilder, ServerHandle};

pub use knightwire_protocol as protocol;
pub use knightwire_room as room;
pub use knightwire_session as session;
pub use knightwire_transport as transport;

/// Everything needed to run a server and plug in a validator.
pub mod prelude {
    pub use crate::{KnightwireError, KnightwireServer, KnightwireServerBuilder, ServerHandle};
    pub use knightwire_protocol::{
        ClientMessage, Codec, Color, CreateGameRequest, CreateGameResponse, ErrorCode, GameCode,
        JsonCodec, MoveDescriptor, PlayerToken, ServerMessage,
    };
    pub use knightwire_room::{PositionValidator, RoomConfig, RoomError};
}
