//! The outbound publish contract and the transport-backed publisher.

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::watch;
use tracing::debug;

use courier_types::{BoxError, CodecError, MessageSerializer, OutboundMessage};

use crate::naming::TopicNaming;
use crate::scope::ResolveError;
use crate::transport::{Transport, TransportError};

/// Errors surfaced synchronously to `publish` callers.
#[derive(Debug, Error)]
pub enum PublishError {
    /// The shutdown signal was observed before the message left.
    #[error("publish cancelled by shutdown")]
    Cancelled,

    /// No publisher could be resolved from the scope.
    #[error(transparent)]
    Resolve(#[from] ResolveError),

    /// The outbound message failed to serialize.
    #[error(transparent)]
    Codec(#[from] CodecError),

    /// The transport rejected the outbound hand-off.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// An external publisher implementation failed; the inner error is the
    /// publisher's, unchanged.
    #[error("publisher failed: {0}")]
    Publisher(#[source] BoxError),
}

/// Serializes an outbound message and hands it to the outbound path.
///
/// Resolved fresh from a scope per publish and dropped with it; never cached
/// across publishes.
#[async_trait]
pub trait MessagePublisher: Send {
    /// Publish one outbound message.
    async fn publish(
        &self,
        outbound: OutboundMessage,
        shutdown: watch::Receiver<bool>,
    ) -> Result<(), PublishError>;
}

/// Publisher that routes by topic name over a [`Transport`].
pub struct TransportPublisher {
    topic_naming: Arc<dyn TopicNaming>,
    serializer: Arc<dyn MessageSerializer>,
    transport: Arc<dyn Transport>,
}

impl TransportPublisher {
    /// Create a publisher over a transport.
    pub fn new(
        topic_naming: Arc<dyn TopicNaming>,
        serializer: Arc<dyn MessageSerializer>,
        transport: Arc<dyn Transport>,
    ) -> Self {
        Self {
            topic_naming,
            serializer,
            transport,
        }
    }
}

#[async_trait]
impl MessagePublisher for TransportPublisher {
    async fn publish(
        &self,
        outbound: OutboundMessage,
        shutdown: watch::Receiver<bool>,
    ) -> Result<(), PublishError> {
        if *shutdown.borrow() {
            return Err(PublishError::Cancelled);
        }

        let topic = self.topic_naming.topic_name(outbound.identity());
        let envelope = outbound.to_envelope(self.serializer.as_ref())?;
        debug!(%topic, message_type = %outbound.identity(), "publishing message");
        self.transport.send(&topic, envelope).await?;
        Ok(())
    }
}
