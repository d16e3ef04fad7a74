//! Error types for the protocol layer.

/// Errors that can occur while encoding or decoding messages.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// Serialization failed.
    #[cfg(feature = "json")]
    #[error("encode failed: {0}")]
    Encode(serde_json::Error),

    /// The bytes are not a valid message: malformed JSON, an unknown
    /// `op`, or missing fields.
    #[cfg(feature = "json")]
    #[error("decode failed: {0}")]
    Decode(serde_json::Error),

    /// Decoded fine but breaks a protocol rule.
    #[error("invalid message: {0}")]
    InvalidMessage(String),
}
