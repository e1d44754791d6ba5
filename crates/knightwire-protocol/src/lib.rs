//! Wire protocol for Knightwire.
//!
//! This crate defines what clients and the server say to each other:
//!
//! - **Types** ([`ClientMessage`], [`ServerMessage`], [`Color`],
//!   [`GameCode`], ...): the JSON shapes that travel over the socket.
//! - **Codec** ([`Codec`] trait, [`JsonCodec`]): how those messages are
//!   turned into text frames and back.
//! - **Errors** ([`ProtocolError`]): what can go wrong while doing so.
//!
//! The protocol layer knows nothing about rooms or connections.
//!
//! ```text
//! Transport (frames) → Protocol (ClientMessage) → Session (coordinator)
//! ```

mod codec;
mod error;
mod types;

pub use codec::{Codec, JsonCodec};
pub use error::ProtocolError;
pub use types::{
    ClientMessage, Color, CreateGameRequest, CreateGameResponse, ErrorCode, GameCode,
    MoveDescriptor, PlayerToken, ServerMessage,
};
