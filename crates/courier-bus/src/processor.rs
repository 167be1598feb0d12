//! Per-delivery message processing.

use std::marker::PhantomData;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::watch;

use courier_types::{
    decode_message, BoxError, Message, MessageHandler, MessageSerializer, SerializedEnvelope,
};

/// Processes one delivered envelope.
///
/// Resolved fresh from a scope per delivery and dropped with it; never cached
/// across deliveries.
#[async_trait]
pub trait MessageProcessor: Send {
    /// Deserialize the payload and run handler logic.
    async fn process(
        &self,
        envelope: &SerializedEnvelope,
        shutdown: watch::Receiver<bool>,
    ) -> Result<(), BoxError>;
}

/// Processor for one `(handler, message)` pair.
///
/// Holds a fresh handler instance, decodes the message type, and delegates to
/// [`MessageHandler::handle`].
pub struct TypedProcessor<H, M> {
    handler: H,
    serializer: Arc<dyn MessageSerializer>,
    _message: PhantomData<fn(M)>,
}

impl<H, M> TypedProcessor<H, M>
where
    H: MessageHandler<M>,
    M: Message,
{
    /// Create a processor around a handler instance.
    pub fn new(handler: H, serializer: Arc<dyn MessageSerializer>) -> Self {
        Self {
            handler,
            serializer,
            _message: PhantomData,
        }
    }
}

#[async_trait]
impl<H, M> MessageProcessor for TypedProcessor<H, M>
where
    H: MessageHandler<M>,
    M: Message,
{
    async fn process(
        &self,
        envelope: &SerializedEnvelope,
        shutdown: watch::Receiver<bool>,
    ) -> Result<(), BoxError> {
        let message: M = decode_message(self.serializer.as_ref(), &envelope.payload)?;
        self.handler.handle(message, shutdown).await
    }
}
