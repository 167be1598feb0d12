//! The serialized message envelope delivered by transports.

use serde::{Deserialize, Serialize};

/// A delivered message in serialized form plus its declared type string.
///
/// Produced by the transport once per delivery and consumed by the dispatch
/// callback; created on the publish path by serializing an outbound message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SerializedEnvelope {
    /// String form of the message's type identity.
    pub message_type: String,
    /// Serialized message body.
    pub payload: Vec<u8>,
}

impl SerializedEnvelope {
    /// Create an envelope from a type string and payload bytes.
    pub fn new(message_type: impl Into<String>, payload: Vec<u8>) -> Self {
        Self {
            message_type: message_type.into(),
            payload,
        }
    }
}
