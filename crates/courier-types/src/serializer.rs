//! Message (de)serialization seam.
//!
//! The bus treats serialization as a collaborator: processors decode inbound
//! payloads and publishers encode outbound messages through the
//! [`MessageSerializer`] trait. The trait stays object-safe by routing
//! through `serde_json::Value`; the generic helpers bridge concrete message
//! types across the trait-object boundary.

use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;

/// Errors from encoding or decoding message payloads.
#[derive(Debug, Error)]
pub enum CodecError {
    /// The message could not be represented in the target format.
    #[error("failed to encode message payload: {0}")]
    Encode(#[source] serde_json::Error),

    /// The payload bytes could not be decoded.
    #[error("failed to decode message payload: {0}")]
    Decode(#[source] serde_json::Error),

    /// An outbound body did not match the type its encoder was built for.
    #[error("outbound message body does not match its recorded type")]
    BodyTypeMismatch,
}

/// Object-safe codec for message payloads.
pub trait MessageSerializer: Send + Sync {
    /// MIME-style content type tag for this codec.
    fn content_type(&self) -> &'static str;

    /// Encode a structured value into payload bytes.
    fn encode_value(&self, value: &serde_json::Value) -> Result<Vec<u8>, CodecError>;

    /// Decode payload bytes into a structured value.
    fn decode_value(&self, bytes: &[u8]) -> Result<serde_json::Value, CodecError>;
}

/// Encode a concrete message through an object-safe serializer.
pub fn encode_message<M: Serialize>(
    serializer: &dyn MessageSerializer,
    message: &M,
) -> Result<Vec<u8>, CodecError> {
    let value = serde_json::to_value(message).map_err(CodecError::Encode)?;
    serializer.encode_value(&value)
}

/// Decode a concrete message through an object-safe serializer.
pub fn decode_message<M: DeserializeOwned>(
    serializer: &dyn MessageSerializer,
    bytes: &[u8],
) -> Result<M, CodecError> {
    let value = serializer.decode_value(bytes)?;
    serde_json::from_value(value).map_err(CodecError::Decode)
}

/// JSON codec, the default wire format for in-process use.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonSerializer;

impl MessageSerializer for JsonSerializer {
    fn content_type(&self) -> &'static str {
        "application/json"
    }

    fn encode_value(&self, value: &serde_json::Value) -> Result<Vec<u8>, CodecError> {
        serde_json::to_vec(value).map_err(CodecError::Encode)
    }

    fn decode_value(&self, bytes: &[u8]) -> Result<serde_json::Value, CodecError> {
        serde_json::from_slice(bytes).map_err(CodecError::Decode)
    }
}
