//! Codec trait and implementations for serializing/deserializing messages.
//!
//! The service does not care how envelopes become bytes, only that
//! something implements [`Codec`]. [`JsonCodec`] is the one shipped: it is
//! easy to produce from any client and easy to read in logs.

use serde::{Serialize, de::DeserializeOwned};

use crate::ProtocolError;

/// Encodes values to bytes and decodes them back.
///
/// `Send + Sync + 'static` because one codec instance is shared by every
/// connection task.
pub trait Codec: Send + Sync + 'static {
    /// Serializes a value into bytes.
    fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, ProtocolError>;

    /// Deserializes bytes into a value.
    fn decode<T: DeserializeOwned>(&self, data: &[u8]) -> Result<T, ProtocolError>;
}

// ---------------------------------------------------------------------------
// JsonCodec
// ---------------------------------------------------------------------------

/// A [`Codec`] that uses JSON (via `serde_json`).
///
/// ```rust
/// use turnstile_protocol::{Codec, JsonCodec, Request, RequestEnvelope};
///
/// let codec = JsonCodec;
/// let bytes = br#"{"id":7,"op":"check","token":"abc"}"#;
///
/// let envelope: RequestEnvelope = codec.decode(bytes).unwrap();
/// assert_eq!(envelope.id, 7);
/// assert_eq!(envelope.request, Request::Check { token: "abc".into() });
/// ```
#[cfg(feature = "json")]
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

#[cfg(feature = "json")]
impl Codec for JsonCodec {
    fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, ProtocolError> {
        serde_json::to_vec(value).map_err(ProtocolError::Encode)
    }

    fn decode<T: DeserializeOwned>(&self, data: &[u8]) -> Result<T, ProtocolError> {
        serde_json::from_slice(data).map_err(ProtocolError::Decode)
    }
}
