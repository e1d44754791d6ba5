//! Codec trait and the JSON implementation.
//!
//! A codec converts between Rust types and the text payloads that travel
//! in WebSocket frames. The coordinator only depends on the [`Codec`]
//! trait, so the encoding can be swapped without touching room logic.

use serde::{Serialize, de::DeserializeOwned};

use crate::ProtocolError;

/// Encodes values to text payloads and decodes inbound frames.
///
/// `Send + Sync + 'static` because one codec instance is shared by every
/// connection task for the lifetime of the server.
pub trait Codec: Send + Sync + 'static {
    /// Serializes a value into a text payload.
    ///
    /// # Errors
    /// Returns `ProtocolError::Encode` if serialization fails.
    fn encode<T: Serialize>(&self, value: &T) -> Result<String, ProtocolError>;

    /// Deserializes an inbound frame.
    ///
    /// Frames arrive as raw bytes because binary frames are accepted too.
    ///
    /// # Errors
    /// Returns `ProtocolError::Decode` if the bytes are malformed or don't
    /// match the expected type.
    fn decode<T: DeserializeOwned>(&self, data: &[u8]) -> Result<T, ProtocolError>;
}

/// A [`Codec`] that uses JSON (via `serde_json`).
///
/// ## Example
///
/// ```rust
/// use knightwire_protocol::{Codec, Color, JsonCodec, ServerMessage};
///
/// let codec = JsonCodec;
/// let text = codec
///     .encode(&ServerMessage::Joined { color: Color::White, moves: vec![] })
///     .unwrap();
/// assert_eq!(text, r#"{"type":"joined","color":"white","moves":[]}"#);
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

impl Codec for JsonCodec {
    fn encode<T: Serialize>(&self, value: &T) -> Result<String, ProtocolError> {
        serde_json::to_string(value).map_err(ProtocolError::Encode)
    }

    fn decode<T: DeserializeOwned>(&self, data: &[u8]) -> Result<T, ProtocolError> {
        serde_json::from_slice(data).map_err(ProtocolError::Decode)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ClientMessage, ErrorCode, ServerMessage};

    #[test]
    fn test_encode_error_message() {
        let text = JsonCodec
            .encode(&ServerMessage::Error {
                code: ErrorCode::NotAPlayer,
                message: "You are not a player in this game".into(),
            })
            .unwrap();
        assert_eq!(
            text,
            r#"{"type":"error","code":"NOT_A_PLAYER","message":"You are not a player in this game"}"#
        );
    }

    #[test]
    fn test_decode_client_message_from_bytes() {
        let msg: ClientMessage = JsonCodec
            .decode(br#"{"type":"leave","gameCode":"ABC123"}"#)
            .unwrap();
        assert!(matches!(msg, ClientMessage::Leave { .. }));
    }

    #[test]
    fn test_decode_garbage_returns_decode_error() {
        let result: Result<ClientMessage, _> = JsonCodec.decode(b"not json at all");
        assert!(matches!(result, Err(ProtocolError::Decode(_))));
    }
}
