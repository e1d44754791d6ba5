//! Error types for the protocol layer.

/// Errors that can occur in the protocol layer.
///
/// Inbound decode failures are never reported to clients; the coordinator
/// drops the frame and logs the error at debug level.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// Serialization of an outbound message failed.
    #[error("encode failed: {0}")]
    Encode(serde_json::Error),

    /// The inbound frame is not valid JSON for the expected message shape.
    ///
    /// Common causes: malformed JSON, an unknown `type`, missing required
    /// fields.
    #[error("decode failed: {0}")]
    Decode(serde_json::Error),

    /// The frame decoded but breaks a protocol rule, e.g. an empty
    /// `gameCode` or a `null` move.
    #[error("invalid message: {0}")]
    InvalidMessage(String),
}
