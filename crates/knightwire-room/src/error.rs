//! Error types for the room layer.

use knightwire_protocol::{ErrorCode, GameCode};

/// Errors that can occur during room operations.
///
/// The `Display` text of the domain variants is what the client sees in the
/// `message` field of an `error` frame.
#[derive(Debug, thiserror::Error)]
pub enum RoomError {
    /// No live room has this code. Also returned for a room that was
    /// deleted while the caller was waiting on its lock.
    #[error("Game not found. Please create a game using the home page.")]
    NotFound(GameCode),

    /// Both seats are occupied.
    #[error("Game is full (2 players max)")]
    RoomFull(GameCode),

    /// The connection holds no seat in the room.
    #[error("You are not a player in this game")]
    NotAPlayer,

    /// The position validator rejected the move. Carries the move as the
    /// client sent it.
    #[error("Invalid move: {0}")]
    IllegalMove(String),

    /// Every generated code collided with an existing room.
    #[error("no free game code after {0} attempts")]
    CodeSpaceExhausted(usize),
}

impl RoomError {
    /// The wire error code for this error, or `None` for errors that are
    /// never reported over a game socket.
    pub fn code(&self) -> Option<ErrorCode> {
        match self {
            Self::NotFound(_) => Some(ErrorCode::InvalidGameError),
            Self::RoomFull(_) => Some(ErrorCode::GameFullError),
            Self::NotAPlayer => Some(ErrorCode::NotAPlayer),
            Self::IllegalMove(_) => Some(ErrorCode::MoveError),
            Self::CodeSpaceExhausted(_) => None,
        }
    }

    /// Whether the offending connection is closed after the error reply.
    pub fn closes_connection(&self) -> bool {
        matches!(self, Self::NotFound(_) | Self::RoomFull(_))
    }
}
