//! The bus orchestrator: listener startup and the publish path.

use std::sync::Arc;

use thiserror::Error;
use tokio::sync::watch;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use courier_types::{Message, OutboundMessage};

use crate::dispatch::make_callback;
use crate::naming::{QueueNaming, TopicNaming};
use crate::publisher::PublishError;
use crate::registry::HandlerRegistry;
use crate::scope::ScopeFactory;
use crate::transport::{ListenerHandle, Transport, TransportError};

/// One handler's listener registration failure.
#[derive(Debug, Error)]
#[error("listener for handler {handler}: {source}")]
pub struct ListenerFailure {
    /// String form of the handler's identity.
    pub handler: String,
    /// The underlying transport failure.
    #[source]
    pub source: TransportError,
}

/// Aggregate failure from [`MessageBus::start`].
///
/// Every per-handler failure is collected; successful registrations from the
/// same call are not rolled back.
#[derive(Debug, Error)]
#[error("failed to start {} of {attempted} listeners", .failures.len())]
pub struct StartError {
    /// Number of handlers whose registration was attempted.
    pub attempted: usize,
    /// All registration failures, in completion order.
    pub failures: Vec<ListenerFailure>,
}

/// The dispatch core: binds registered handlers to a transport and exposes
/// the outbound publish path.
///
/// All collaborators are explicit constructor arguments; the bus holds no
/// ambient or global state, and `start`/`publish` take `&self`.
pub struct MessageBus {
    registry: Arc<HandlerRegistry>,
    queue_naming: Arc<dyn QueueNaming>,
    topic_naming: Arc<dyn TopicNaming>,
    transport: Arc<dyn Transport>,
    scopes: Arc<dyn ScopeFactory>,
}

impl std::fmt::Debug for MessageBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MessageBus")
            .field("registry", &self.registry)
            .field("queue_naming", &"<dyn QueueNaming>")
            .field("topic_naming", &"<dyn TopicNaming>")
            .field("transport", &"<dyn Transport>")
            .field("scopes", &"<dyn ScopeFactory>")
            .finish()
    }
}

impl MessageBus {
    /// Compose a bus from its collaborators.
    pub fn new(
        registry: HandlerRegistry,
        queue_naming: Arc<dyn QueueNaming>,
        topic_naming: Arc<dyn TopicNaming>,
        transport: Arc<dyn Transport>,
        scopes: Arc<dyn ScopeFactory>,
    ) -> Self {
        Self {
            registry: Arc::new(registry),
            queue_naming,
            topic_naming,
            transport,
            scopes,
        }
    }

    /// The registered handler descriptors.
    #[must_use]
    pub fn registry(&self) -> &HandlerRegistry {
        &self.registry
    }

    /// Start one listener per registered handler.
    ///
    /// Registrations run concurrently and are all awaited: one failure does
    /// not cancel the others. On any failure the error carries every
    /// [`ListenerFailure`]; on success the listener handles are returned in
    /// completion order.
    pub async fn start(
        &self,
        shutdown: watch::Receiver<bool>,
    ) -> Result<Vec<ListenerHandle>, StartError> {
        let attempted = self.registry.len();
        info!(handlers = attempted, "starting bus listeners");

        let mut registrations = JoinSet::new();
        for descriptor in self.registry.descriptors() {
            let queue = self.queue_naming.queue_name(descriptor.handler());
            let topics: Vec<String> = descriptor
                .messages()
                .iter()
                .map(|message| self.topic_naming.topic_name(*message))
                .collect();
            let callback = make_callback(Arc::clone(descriptor), Arc::clone(&self.scopes));
            let transport = Arc::clone(&self.transport);
            let shutdown = shutdown.clone();
            let handler = descriptor.handler().full_name().to_string();

            registrations.spawn(async move {
                let result = if *shutdown.borrow() {
                    Err(TransportError::Cancelled)
                } else {
                    transport
                        .start_listener(&queue, &topics, callback, shutdown)
                        .await
                };
                result.map_err(|source| ListenerFailure { handler, source })
            });
        }

        let mut handles = Vec::with_capacity(attempted);
        let mut failures = Vec::new();
        while let Some(joined) = registrations.join_next().await {
            match joined {
                Ok(Ok(handle)) => {
                    debug!(queue = handle.queue(), listener = %handle.id(), "listener started");
                    handles.push(handle);
                }
                Ok(Err(failure)) => {
                    warn!(
                        handler = %failure.handler,
                        error = %failure.source,
                        "listener failed to start"
                    );
                    failures.push(failure);
                }
                Err(join_error) => {
                    warn!(error = %join_error, "listener registration task aborted");
                    failures.push(ListenerFailure {
                        handler: String::from("<unknown>"),
                        source: TransportError::RegistrationAborted {
                            reason: join_error.to_string(),
                        },
                    });
                }
            }
        }

        if failures.is_empty() {
            info!(listeners = handles.len(), "all listeners started");
            Ok(handles)
        } else {
            Err(StartError {
                attempted,
                failures,
            })
        }
    }

    /// Publish one message through a fresh resolution scope.
    ///
    /// Concurrent publishes are independent: each gets its own scope and
    /// publisher instance, and nothing here blocks another call.
    pub async fn publish<M: Message>(
        &self,
        message: M,
        shutdown: watch::Receiver<bool>,
    ) -> Result<(), PublishError> {
        if *shutdown.borrow() {
            return Err(PublishError::Cancelled);
        }

        let scope = self.scopes.create_scope();
        let publisher = scope.publisher()?;
        publisher
            .publish(OutboundMessage::new(message), shutdown)
            .await
    }
}
