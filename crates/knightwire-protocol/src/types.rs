//! Message types for Knightwire's wire format.
//!
//! Every type here is serialized as JSON and travels in a WebSocket text
//! frame. Field names follow the browser client's camelCase conventions.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize};

use crate::ProtocolError;

// ---------------------------------------------------------------------------
// Identity types
// ---------------------------------------------------------------------------

/// The code that identifies one game room, e.g. `"3FA9C01B7E42"`.
///
/// Codes are generated by the room store; clients echo them back when
/// joining or leaving.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GameCode(String);

impl GameCode {
    /// Wraps a code, trimming surrounding whitespace.
    pub fn new(code: impl AsRef<str>) -> Self {
        Self(code.as_ref().trim().to_string())
    }

    /// Returns the code as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    fn trimmed(self) -> Self {
        if self.0.trim().len() == self.0.len() {
            self
        } else {
            Self::new(&self.0)
        }
    }
}

impl fmt::Display for GameCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The opaque identity token a client presents when joining.
///
/// The server never interprets it beyond equality: the same token on a new
/// connection recovers the seat it was last bound to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlayerToken(String);

impl PlayerToken {
    /// Wraps a token as-is.
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// Returns the token as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PlayerToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ---------------------------------------------------------------------------
// Color
// ---------------------------------------------------------------------------

/// One of the two seats at the board.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Color {
    White,
    Black,
}

impl Color {
    /// Both colors, in default seating order.
    pub const ALL: [Color; 2] = [Color::White, Color::Black];

    /// The opposing color.
    pub fn other(self) -> Self {
        match self {
            Color::White => Color::Black,
            Color::Black => Color::White,
        }
    }

    /// Stable slot index: white is 0, black is 1.
    pub fn index(self) -> usize {
        match self {
            Color::White => 0,
            Color::Black => 1,
        }
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Color::White => f.write_str("white"),
            Color::Black => f.write_str("black"),
        }
    }
}

impl FromStr for Color {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "white" => Ok(Color::White),
            "black" => Ok(Color::Black),
            other => Err(ProtocolError::InvalidMessage(format!(
                "unknown color {other:?}"
            ))),
        }
    }
}

/// Reads an optional color, treating anything that isn't exactly
/// `"white"` or `"black"` as absent instead of failing the whole message.
fn lenient_color<'de, D>(deserializer: D) -> Result<Option<Color>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(raw
        .as_ref()
        .and_then(serde_json::Value::as_str)
        .and_then(|s| s.parse().ok()))
}

// ---------------------------------------------------------------------------
// MoveDescriptor
// ---------------------------------------------------------------------------

/// A move as submitted by a client.
///
/// The shape belongs to the position validator (SAN string, coordinate
/// object, ...). The server stores and replays it verbatim.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MoveDescriptor(serde_json::Value);

impl MoveDescriptor {
    /// Wraps a raw JSON value.
    pub fn new(value: serde_json::Value) -> Self {
        Self(value)
    }

    /// Returns the raw JSON value.
    pub fn as_value(&self) -> &serde_json::Value {
        &self.0
    }

    /// Returns the descriptor as a string if the client sent one.
    pub fn as_str(&self) -> Option<&str> {
        self.0.as_str()
    }
}

impl From<&str> for MoveDescriptor {
    fn from(san: &str) -> Self {
        Self(serde_json::Value::String(san.to_string()))
    }
}

/// Strings print bare (`e4`); anything else prints as compact JSON.
impl fmt::Display for MoveDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.0 {
            serde_json::Value::String(s) => f.write_str(s),
            other => write!(f, "{other}"),
        }
    }
}

// ---------------------------------------------------------------------------
// Client → Server
// ---------------------------------------------------------------------------

/// Messages a client sends over its socket.
///
/// Internally tagged on `type`:
///
/// ```text
/// { "type": "join",  "gameCode": "...", "playerId": "...", "requestedColor": "white" }
/// { "type": "move",  "move": "e4" }
/// { "type": "leave", "gameCode": "..." }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ClientMessage {
    /// Take a seat in a room, or recover the seat bound to `player_id`.
    Join {
        #[serde(rename = "gameCode")]
        game_code: GameCode,
        #[serde(rename = "playerId")]
        player_id: PlayerToken,
        #[serde(
            rename = "requestedColor",
            default,
            deserialize_with = "lenient_color",
            skip_serializing_if = "Option::is_none"
        )]
        requested_color: Option<Color>,
    },

    /// Submit a move in the room this connection joined.
    Move {
        #[serde(rename = "move")]
        mv: MoveDescriptor,
    },

    /// Leave the named room without closing the socket.
    Leave {
        #[serde(rename = "gameCode")]
        game_code: GameCode,
    },
}

impl ClientMessage {
    /// Normalizes a decoded message and rejects the shapes the server
    /// ignores: blank codes or identities, and a `null` move.
    pub fn validated(self) -> Result<Self, ProtocolError> {
        match self {
            ClientMessage::Join {
                game_code,
                player_id,
                requested_color,
            } => {
                let game_code = game_code.trimmed();
                if game_code.as_str().is_empty() {
                    return Err(ProtocolError::InvalidMessage("join without gameCode".into()));
                }
                if player_id.as_str().trim().is_empty() {
                    return Err(ProtocolError::InvalidMessage("join without playerId".into()));
                }
                Ok(ClientMessage::Join {
                    game_code,
                    player_id,
                    requested_color,
                })
            }
            ClientMessage::Move { mv } => {
                if mv.as_value().is_null() {
                    return Err(ProtocolError::InvalidMessage("move is null".into()));
                }
                Ok(ClientMessage::Move { mv })
            }
            ClientMessage::Leave { game_code } => {
                let game_code = game_code.trimmed();
                if game_code.as_str().is_empty() {
                    return Err(ProtocolError::InvalidMessage("leave without gameCode".into()));
                }
                Ok(ClientMessage::Leave { game_code })
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Server → Client
// ---------------------------------------------------------------------------

/// The error kinds a client can receive.
///
/// Serialized in SCREAMING_SNAKE_CASE, e.g. `"GAME_FULL_ERROR"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// The room code doesn't name a live room.
    InvalidGameError,
    /// Both seats are taken.
    GameFullError,
    /// A move came from a connection without a seat.
    NotAPlayer,
    /// The validator rejected the move.
    MoveError,
}

/// Messages the server sends to a client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ServerMessage {
    /// Unicast reply to a successful join or reconnection.
    Joined {
        color: Color,
        moves: Vec<MoveDescriptor>,
    },

    /// Room-wide broadcast after every accepted move. Always carries the
    /// full history, not a delta.
    Sync { moves: Vec<MoveDescriptor> },

    /// Unicast domain error. Never broadcast.
    Error { code: ErrorCode, message: String },
}

// ---------------------------------------------------------------------------
// Room creation
// ---------------------------------------------------------------------------

/// Body of a room creation request.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CreateGameRequest {
    #[serde(
        rename = "requestedColor",
        default,
        deserialize_with = "lenient_color",
        skip_serializing_if = "Option::is_none"
    )]
    pub requested_color: Option<Color>,
}

/// Reply to a room creation request. The requested color is echoed so
/// the client can pass it along with its first join.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateGameResponse {
    #[serde(rename = "gameCode")]
    pub game_code: GameCode,
    #[serde(
        rename = "requestedColor",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub requested_color: Option<Color>,
}
