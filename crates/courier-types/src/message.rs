//! The message contract and the type-erased outbound wrapper.

use std::any::Any;
use std::fmt;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::envelope::SerializedEnvelope;
use crate::identity::TypeIdentity;
use crate::serializer::{encode_message, CodecError, MessageSerializer};

/// A publishable, handleable message type.
///
/// The wire name defaults to the Rust type path; override it to pin an
/// identity that survives moves between modules:
///
/// ```
/// use courier_types::Message;
/// use serde::{Deserialize, Serialize};
///
/// #[derive(Serialize, Deserialize)]
/// struct OrderCreated {
///     order_id: u64,
/// }
///
/// impl Message for OrderCreated {
///     fn wire_name() -> &'static str {
///         "Orders.Created"
///     }
/// }
/// ```
pub trait Message: Serialize + DeserializeOwned + Send + Sync + 'static {
    /// Stable string identity carried in envelopes for this type.
    fn wire_name() -> &'static str {
        std::any::type_name::<Self>()
    }

    /// Full identity of this message type.
    fn identity() -> TypeIdentity {
        TypeIdentity::named::<Self>(Self::wire_name())
    }
}

type ErasedEncoder =
    fn(&(dyn Any + Send + Sync), &dyn MessageSerializer) -> Result<Vec<u8>, CodecError>;

/// A message leaving the bus, erased for the publisher boundary.
///
/// Built where the concrete type is known; the captured encoder lets a
/// trait-object publisher serialize without that knowledge, and
/// [`downcast_ref`](Self::downcast_ref) recovers the typed body for
/// in-process delivery or test assertions.
pub struct OutboundMessage {
    identity: TypeIdentity,
    body: Box<dyn Any + Send + Sync>,
    encode: ErasedEncoder,
}

impl OutboundMessage {
    /// Wrap a concrete message for the outbound path.
    pub fn new<M: Message>(message: M) -> Self {
        fn encode_erased<M: Message>(
            body: &(dyn Any + Send + Sync),
            serializer: &dyn MessageSerializer,
        ) -> Result<Vec<u8>, CodecError> {
            match body.downcast_ref::<M>() {
                Some(message) => encode_message(serializer, message),
                None => Err(CodecError::BodyTypeMismatch),
            }
        }

        Self {
            identity: M::identity(),
            body: Box::new(message),
            encode: encode_erased::<M>,
        }
    }

    /// Identity of the wrapped message type.
    #[must_use]
    pub fn identity(&self) -> TypeIdentity {
        self.identity
    }

    /// The typed body, if `M` is the wrapped type.
    #[must_use]
    pub fn downcast_ref<M: Message>(&self) -> Option<&M> {
        self.body.downcast_ref()
    }

    /// Serialize into an envelope carrying this message's wire name.
    pub fn to_envelope(
        &self,
        serializer: &dyn MessageSerializer,
    ) -> Result<SerializedEnvelope, CodecError> {
        let payload = (self.encode)(self.body.as_ref(), serializer)?;
        Ok(SerializedEnvelope::new(self.identity.full_name(), payload))
    }
}

impl fmt::Debug for OutboundMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OutboundMessage")
            .field("identity", &self.identity)
            .finish_non_exhaustive()
    }
}
