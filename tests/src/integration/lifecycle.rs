//! # Bus Lifecycle Flows
//!
//! Start-up behavior through the public API: concurrent listener
//! registration, naming-call accounting, collect-all failure reporting, and
//! cancellation before registration.

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use tokio::sync::watch;
    use tokio::time::timeout;

    use courier_bus::{
        DispatchTable, DottedNaming, HandlerDescriptor, HandlerRegistry, MemoryTransport,
        MessageBus, QueueNaming, TableScopeFactory, TopicNaming, Transport, TransportError,
    };
    use courier_types::{Message, TypeIdentity};

    use crate::integration::support::{
        init_logging, CountingNaming, OrderCancelled, OrderCreated, OrderHandler, OrderShipped,
        RecordingTransport, ShipmentHandler,
    };

    fn two_handler_registry() -> HandlerRegistry {
        HandlerRegistry::new(vec![
            HandlerDescriptor::new(
                TypeIdentity::of::<OrderHandler>(),
                vec![OrderCreated::identity(), OrderCancelled::identity()],
            ),
            HandlerDescriptor::new(
                TypeIdentity::of::<ShipmentHandler>(),
                vec![OrderShipped::identity()],
            ),
        ])
        .expect("registry")
    }

    fn empty_scopes() -> Arc<TableScopeFactory> {
        Arc::new(TableScopeFactory::new(DispatchTable::new()))
    }

    #[tokio::test]
    async fn test_start_registers_one_listener_per_handler() {
        init_logging();
        let transport = Arc::new(MemoryTransport::new());
        let bus = MessageBus::new(
            two_handler_registry(),
            Arc::new(DottedNaming),
            Arc::new(DottedNaming),
            transport,
            empty_scopes(),
        );
        let (_shutdown_tx, shutdown_rx) = watch::channel(false);

        let handles = bus.start(shutdown_rx).await.expect("start");

        assert_eq!(handles.len(), 2);
        let queues: Vec<&str> = handles.iter().map(|handle| handle.queue()).collect();
        let order_queue = DottedNaming.queue_name(TypeIdentity::of::<OrderHandler>());
        let shipment_queue = DottedNaming.queue_name(TypeIdentity::of::<ShipmentHandler>());
        assert!(queues.contains(&order_queue.as_str()));
        assert!(queues.contains(&shipment_queue.as_str()));
    }

    #[tokio::test]
    async fn test_start_invokes_naming_exactly_once_per_identity() {
        let naming = Arc::new(CountingNaming::default());
        let queue_naming: Arc<dyn QueueNaming> = naming.clone();
        let topic_naming: Arc<dyn TopicNaming> = naming.clone();
        let bus = MessageBus::new(
            two_handler_registry(),
            queue_naming,
            topic_naming,
            Arc::new(RecordingTransport::default()),
            empty_scopes(),
        );
        let (_shutdown_tx, shutdown_rx) = watch::channel(false);

        bus.start(shutdown_rx).await.expect("start");

        assert_eq!(
            naming.queue_calls(std::any::type_name::<OrderHandler>()),
            1
        );
        assert_eq!(
            naming.queue_calls(std::any::type_name::<ShipmentHandler>()),
            1
        );
        assert_eq!(naming.topic_calls("Orders.Created"), 1);
        assert_eq!(naming.topic_calls("Orders.Cancelled"), 1);
        assert_eq!(naming.topic_calls("Orders.Shipped"), 1);
    }

    #[tokio::test]
    async fn test_listener_binds_every_accepted_topic() {
        let transport = Arc::new(RecordingTransport::default());
        let dyn_transport: Arc<dyn Transport> = transport.clone();
        let bus = MessageBus::new(
            two_handler_registry(),
            Arc::new(DottedNaming),
            Arc::new(DottedNaming),
            dyn_transport,
            empty_scopes(),
        );
        let (_shutdown_tx, shutdown_rx) = watch::channel(false);

        bus.start(shutdown_rx).await.expect("start");

        let started = transport
            .started
            .lock()
            .expect("lock");
        let order_queue = DottedNaming.queue_name(TypeIdentity::of::<OrderHandler>());
        let topics = &started
            .iter()
            .find(|(queue, _)| *queue == order_queue)
            .expect("order listener")
            .1;
        assert_eq!(
            topics,
            &vec!["Orders.Created".to_string(), "Orders.Cancelled".to_string()]
        );
    }

    #[tokio::test]
    async fn test_one_failure_does_not_cancel_other_registrations() {
        let order_queue = DottedNaming.queue_name(TypeIdentity::of::<OrderHandler>());
        let shipment_queue = DottedNaming.queue_name(TypeIdentity::of::<ShipmentHandler>());
        let transport = Arc::new(RecordingTransport::failing([order_queue]));
        let dyn_transport: Arc<dyn Transport> = transport.clone();
        let bus = MessageBus::new(
            two_handler_registry(),
            Arc::new(DottedNaming),
            Arc::new(DottedNaming),
            dyn_transport,
            empty_scopes(),
        );
        let (_shutdown_tx, shutdown_rx) = watch::channel(false);

        let error = bus.start(shutdown_rx).await.expect_err("must fail");

        assert_eq!(error.attempted, 2);
        assert_eq!(error.failures.len(), 1);
        assert_eq!(
            error.failures[0].handler,
            std::any::type_name::<OrderHandler>()
        );
        // The healthy handler still registered.
        assert_eq!(transport.started_queues(), vec![shipment_queue]);
    }

    #[tokio::test]
    async fn test_start_collects_every_failure() {
        let transport = Arc::new(RecordingTransport::failing([
            DottedNaming.queue_name(TypeIdentity::of::<OrderHandler>()),
            DottedNaming.queue_name(TypeIdentity::of::<ShipmentHandler>()),
        ]));
        let bus = MessageBus::new(
            two_handler_registry(),
            Arc::new(DottedNaming),
            Arc::new(DottedNaming),
            transport,
            empty_scopes(),
        );
        let (_shutdown_tx, shutdown_rx) = watch::channel(false);

        let error = bus.start(shutdown_rx).await.expect_err("must fail");

        assert_eq!(error.attempted, 2);
        assert_eq!(error.failures.len(), 2);
    }

    #[tokio::test]
    async fn test_start_with_immediate_cancel_fails_promptly() {
        let bus = MessageBus::new(
            two_handler_registry(),
            Arc::new(DottedNaming),
            Arc::new(DottedNaming),
            Arc::new(MemoryTransport::new()),
            empty_scopes(),
        );
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        shutdown_tx.send(true).expect("signal");

        let error = timeout(Duration::from_secs(1), bus.start(shutdown_rx))
            .await
            .expect("prompt return")
            .expect_err("must fail");

        assert_eq!(error.failures.len(), 2);
        assert!(error
            .failures
            .iter()
            .all(|failure| matches!(failure.source, TransportError::Cancelled)));
    }
}
