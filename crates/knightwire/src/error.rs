//! Unified error type for Knightwire.

use knightwire_protocol::ProtocolError;
use knightwire_room::RoomError;
use knightwire_transport::TransportError;

/// Top-level error that wraps all crate-specific errors.
///
/// The `#[from]` attribute on each variant lets `?` convert sub-crate
/// errors automatically.
#[derive(Debug, thiserror::Error)]
pub enum KnightwireError {
    /// A transport-level error (bind, accept, send, recv).
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A protocol-level error (encode, decode, invalid message).
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// A room-level error (not found, full, code space exhausted).
    #[error(transparent)]
    Room(#[from] RoomError),

    /// A socket error outside the transport, e.g. reading the bound
    /// address.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
