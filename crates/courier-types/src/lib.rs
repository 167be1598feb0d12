//! # Courier Types Crate
//!
//! Cross-crate type definitions for the Courier message bus: type identities,
//! the serialized envelope, the [`Message`] and [`MessageHandler`] contracts,
//! and the serializer seam.
//!
//! ## Design Principles
//!
//! - **Single Source of Truth**: every type exchanged between the bus, its
//!   transports, and its handlers is defined here.
//! - **String-form identity**: a message's wire identity is the string form
//!   of its [`TypeIdentity`]; envelopes carry that string, never the type.
//! - **Open error edges**: handler and publisher failures travel as
//!   [`BoxError`] so external errors pass through the bus unchanged.

pub mod envelope;
pub mod handler;
pub mod identity;
pub mod message;
pub mod serializer;

pub use envelope::SerializedEnvelope;
pub use handler::MessageHandler;
pub use identity::TypeIdentity;
pub use message::{Message, OutboundMessage};
pub use serializer::{
    decode_message, encode_message, CodecError, JsonSerializer, MessageSerializer,
};

/// Boxed error for the open edges of the bus (handler and publisher
/// failures), passed through unchanged.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;
