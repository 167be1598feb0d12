//! Composition root: typed handler registration and bus assembly.

use std::marker::PhantomData;
use std::sync::Arc;

use thiserror::Error;

use courier_types::{
    JsonSerializer, Message, MessageHandler, MessageSerializer, TypeIdentity,
};

use crate::bus::MessageBus;
use crate::naming::{DottedNaming, QueueNaming, TopicNaming};
use crate::processor::TypedProcessor;
use crate::publisher::TransportPublisher;
use crate::registry::{HandlerDescriptor, HandlerRegistry, RegistryError};
use crate::scope::{DispatchTable, PublisherFactory, TableScopeFactory};
use crate::transport::Transport;

/// Errors from assembling a bus.
#[derive(Debug, Error)]
pub enum BuildError {
    /// No transport was supplied.
    #[error("no transport configured")]
    MissingTransport,

    /// A registration violated the descriptor invariants.
    #[error(transparent)]
    Registry(#[from] RegistryError),
}

/// Builds a [`MessageBus`] from typed registrations.
///
/// Registering a handler installs its descriptor entry and its per-message
/// processor factories in one step, so the registry and the dispatch table
/// cannot drift apart.
///
/// ```
/// use std::sync::Arc;
/// use courier_bus::{BusBuilder, MemoryTransport};
/// # use courier_types::{BoxError, Message, MessageHandler};
/// # use async_trait::async_trait;
/// # use serde::{Deserialize, Serialize};
/// # use tokio::sync::watch;
/// #
/// # #[derive(Serialize, Deserialize)]
/// # struct OrderCreated { order_id: u64 }
/// # impl Message for OrderCreated {
/// #     fn wire_name() -> &'static str { "Orders.Created" }
/// # }
/// # #[derive(Default)]
/// # struct OrderHandler;
/// # #[async_trait]
/// # impl MessageHandler<OrderCreated> for OrderHandler {
/// #     async fn handle(&self, _m: OrderCreated, _s: watch::Receiver<bool>)
/// #         -> Result<(), BoxError> { Ok(()) }
/// # }
///
/// let bus = BusBuilder::new()
///     .transport(Arc::new(MemoryTransport::new()))
///     .register::<OrderHandler, _>(OrderHandler::default)
///     .accepts::<OrderCreated>()
///     .done()
///     .build()
///     .expect("bus");
/// ```
pub struct BusBuilder {
    descriptors: Vec<(TypeIdentity, Vec<TypeIdentity>)>,
    table: DispatchTable,
    serializer: Arc<dyn MessageSerializer>,
    queue_naming: Arc<dyn QueueNaming>,
    topic_naming: Arc<dyn TopicNaming>,
    transport: Option<Arc<dyn Transport>>,
    publisher: Option<PublisherFactory>,
}

impl BusBuilder {
    /// Start a builder with JSON serialization and dotted naming.
    #[must_use]
    pub fn new() -> Self {
        Self {
            descriptors: Vec::new(),
            table: DispatchTable::new(),
            serializer: Arc::new(JsonSerializer),
            queue_naming: Arc::new(DottedNaming),
            topic_naming: Arc::new(DottedNaming),
            transport: None,
            publisher: None,
        }
    }

    /// Use `transport` for listeners and the default publisher.
    #[must_use]
    pub fn transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Replace the default JSON serializer.
    #[must_use]
    pub fn serializer(mut self, serializer: Arc<dyn MessageSerializer>) -> Self {
        self.serializer = serializer;
        self
    }

    /// Replace the default queue naming convention.
    #[must_use]
    pub fn queue_naming(mut self, naming: Arc<dyn QueueNaming>) -> Self {
        self.queue_naming = naming;
        self
    }

    /// Replace the default topic naming convention.
    #[must_use]
    pub fn topic_naming(mut self, naming: Arc<dyn TopicNaming>) -> Self {
        self.topic_naming = naming;
        self
    }

    /// Replace the default transport-backed publisher factory.
    #[must_use]
    pub fn publisher(mut self, factory: PublisherFactory) -> Self {
        self.publisher = Some(factory);
        self
    }

    /// Register a handler type; `factory` creates one instance per delivery.
    #[must_use]
    pub fn register<H, F>(self, factory: F) -> HandlerRegistration<H, F>
    where
        H: Send + Sync + 'static,
        F: Fn() -> H + Send + Sync + Clone + 'static,
    {
        HandlerRegistration {
            builder: self,
            factory,
            handler: TypeIdentity::of::<H>(),
            messages: Vec::new(),
            _handler: PhantomData,
        }
    }

    /// Validate registrations and assemble the bus.
    pub fn build(self) -> Result<MessageBus, BuildError> {
        let Self {
            descriptors,
            mut table,
            serializer,
            queue_naming,
            topic_naming,
            transport,
            publisher,
        } = self;

        let transport = transport.ok_or(BuildError::MissingTransport)?;

        let mut built = Vec::with_capacity(descriptors.len());
        for (handler, messages) in descriptors {
            built.push(HandlerDescriptor::new(handler, messages));
        }
        let registry = HandlerRegistry::new(built)?;

        let publisher = publisher.unwrap_or_else(|| {
            let topic_naming = Arc::clone(&topic_naming);
            let serializer = Arc::clone(&serializer);
            let transport = Arc::clone(&transport);
            Box::new(move || {
                Box::new(TransportPublisher::new(
                    Arc::clone(&topic_naming),
                    Arc::clone(&serializer),
                    Arc::clone(&transport),
                ))
            })
        });
        table.set_publisher(publisher);

        Ok(MessageBus::new(
            registry,
            queue_naming,
            topic_naming,
            transport,
            Arc::new(TableScopeFactory::new(table)),
        ))
    }
}

impl Default for BusBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// In-progress registration of one handler type.
pub struct HandlerRegistration<H, F> {
    builder: BusBuilder,
    factory: F,
    handler: TypeIdentity,
    messages: Vec<TypeIdentity>,
    _handler: PhantomData<fn(H)>,
}

impl<H, F> HandlerRegistration<H, F>
where
    H: Send + Sync + 'static,
    F: Fn() -> H + Send + Sync + Clone + 'static,
{
    /// Accept message type `M`, installing the `(H, M)` processor factory.
    #[must_use]
    pub fn accepts<M>(mut self) -> Self
    where
        M: Message,
        H: MessageHandler<M>,
    {
        let message = M::identity();
        let factory = self.factory.clone();
        let serializer = Arc::clone(&self.builder.serializer);
        self.builder.table.register_processor(
            self.handler,
            message,
            Box::new(move || {
                Box::new(TypedProcessor::<H, M>::new(
                    factory(),
                    Arc::clone(&serializer),
                ))
            }),
        );
        self.messages.push(message);
        self
    }

    /// Finish this handler's registration.
    #[must_use]
    pub fn done(mut self) -> BusBuilder {
        self.builder.descriptors.push((self.handler, self.messages));
        self.builder
    }
}
