//! # Publish and Dispatch Round Trips
//!
//! End-to-end flows over the in-memory transport: publish, topic routing,
//! delivery, decode, and handler invocation, plus the dispatch error surface
//! for unsupported types.

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    use tokio::sync::watch;
    use tokio::time::timeout;

    use courier_bus::{
        dispatch, BusBuilder, DispatchError, DispatchTable, HandlerDescriptor, HandlerRegistry,
        MemoryTransport, MessageBus, DottedNaming, TableScopeFactory, Transport,
    };
    use courier_types::{Message, SerializedEnvelope, TypeIdentity};

    use crate::integration::support::{
        init_logging, recorded, OrderCancelled, OrderCreated, OrderHandler, OrderShipped,
        RecordingPublisher,
    };

    async fn wait_for_entries(
        handled: &Arc<Mutex<Vec<String>>>,
        expected: usize,
    ) -> Vec<String> {
        timeout(Duration::from_secs(1), async {
            loop {
                let entries = recorded(handled);
                if entries.len() >= expected {
                    return entries;
                }
                tokio::task::yield_now().await;
            }
        })
        .await
        .expect("handler invocation")
    }

    #[tokio::test]
    async fn test_publish_reaches_handler_end_to_end() {
        init_logging();
        let handled = Arc::new(Mutex::new(Vec::new()));
        let handler_log = Arc::clone(&handled);

        let bus = BusBuilder::new()
            .transport(Arc::new(MemoryTransport::new()))
            .register::<OrderHandler, _>(move || OrderHandler::new(Arc::clone(&handler_log)))
            .accepts::<OrderCreated>()
            .accepts::<OrderCancelled>()
            .done()
            .build()
            .expect("bus");

        let (_shutdown_tx, shutdown_rx) = watch::channel(false);
        let _handles = bus.start(shutdown_rx.clone()).await.expect("start");

        bus.publish(OrderCreated { order_id: 7 }, shutdown_rx)
            .await
            .expect("publish");

        let entries = wait_for_entries(&handled, 1).await;
        assert_eq!(entries, vec!["Orders.Created:7".to_string()]);
    }

    #[tokio::test]
    async fn test_each_message_type_routes_to_its_processor() {
        let handled = Arc::new(Mutex::new(Vec::new()));
        let handler_log = Arc::clone(&handled);

        let bus = BusBuilder::new()
            .transport(Arc::new(MemoryTransport::new()))
            .register::<OrderHandler, _>(move || OrderHandler::new(Arc::clone(&handler_log)))
            .accepts::<OrderCreated>()
            .accepts::<OrderCancelled>()
            .done()
            .build()
            .expect("bus");

        let (_shutdown_tx, shutdown_rx) = watch::channel(false);
        let _handles = bus.start(shutdown_rx.clone()).await.expect("start");

        bus.publish(OrderCreated { order_id: 1 }, shutdown_rx.clone())
            .await
            .expect("publish created");
        bus.publish(OrderCancelled { order_id: 2 }, shutdown_rx)
            .await
            .expect("publish cancelled");

        let mut entries = wait_for_entries(&handled, 2).await;
        entries.sort();
        assert_eq!(
            entries,
            vec![
                "Orders.Cancelled:2".to_string(),
                "Orders.Created:1".to_string(),
            ]
        );
    }

    #[tokio::test]
    async fn test_unsupported_type_names_handler_and_type() {
        let descriptor = HandlerDescriptor::new(
            TypeIdentity::of::<OrderHandler>(),
            vec![OrderCreated::identity(), OrderCancelled::identity()],
        );
        let scopes = TableScopeFactory::new(DispatchTable::new());
        let (_shutdown_tx, shutdown_rx) = watch::channel(false);

        let error = dispatch(
            &descriptor,
            &scopes,
            SerializedEnvelope::new(OrderShipped::wire_name(), b"{\"order_id\":3}".to_vec()),
            shutdown_rx,
        )
        .await
        .expect_err("must fail");

        assert!(matches!(
            error,
            DispatchError::UnsupportedMessageType { .. }
        ));
        let rendered = error.to_string();
        assert!(rendered.contains("OrderHandler"));
        assert!(rendered.contains("Orders.Shipped"));
    }

    #[tokio::test]
    async fn test_custom_publisher_receives_outbound_identity() {
        let published = Arc::new(Mutex::new(Vec::new()));
        let captured = Arc::clone(&published);

        let bus = BusBuilder::new()
            .transport(Arc::new(MemoryTransport::new()))
            .publisher(Box::new(move || {
                Box::new(RecordingPublisher {
                    published: Arc::clone(&captured),
                })
            }))
            .build()
            .expect("bus");

        let (_shutdown_tx, shutdown_rx) = watch::channel(false);
        bus.publish(OrderCreated { order_id: 5 }, shutdown_rx)
            .await
            .expect("publish");

        assert_eq!(recorded(&published), vec!["Orders.Created".to_string()]);
    }

    #[tokio::test]
    async fn test_delivered_payload_round_trips_through_serializer() {
        let transport: Arc<dyn Transport> = Arc::new(MemoryTransport::new());
        let handled = Arc::new(Mutex::new(Vec::new()));
        let handler_log = Arc::clone(&handled);

        let bus = BusBuilder::new()
            .transport(Arc::clone(&transport))
            .register::<OrderHandler, _>(move || OrderHandler::new(Arc::clone(&handler_log)))
            .accepts::<OrderCreated>()
            .done()
            .build()
            .expect("bus");

        let (_shutdown_tx, shutdown_rx) = watch::channel(false);
        let _handles = bus.start(shutdown_rx.clone()).await.expect("start");

        // Hand-built envelope, as a remote publisher would produce it.
        transport
            .send(
                "Orders.Created",
                SerializedEnvelope::new("Orders.Created", b"{\"order_id\":42}".to_vec()),
            )
            .await
            .expect("send");

        let entries = wait_for_entries(&handled, 1).await;
        assert_eq!(entries, vec!["Orders.Created:42".to_string()]);
    }

    #[tokio::test]
    async fn test_publish_without_binding_surfaces_transport_error() {
        let bus = BusBuilder::new()
            .transport(Arc::new(MemoryTransport::new()))
            .build()
            .expect("bus");
        let (_shutdown_tx, shutdown_rx) = watch::channel(false);

        let error = bus
            .publish(OrderCreated { order_id: 1 }, shutdown_rx)
            .await
            .expect_err("must fail");
        assert!(error.to_string().contains("Orders.Created"));
    }

    #[tokio::test]
    async fn test_bus_constructed_by_hand_matches_builder_behavior() {
        let registry = HandlerRegistry::new(vec![HandlerDescriptor::new(
            TypeIdentity::of::<OrderHandler>(),
            vec![OrderCreated::identity()],
        )])
        .expect("registry");
        let bus = MessageBus::new(
            registry,
            Arc::new(DottedNaming),
            Arc::new(DottedNaming),
            Arc::new(MemoryTransport::new()),
            Arc::new(TableScopeFactory::new(DispatchTable::new())),
        );
        assert_eq!(bus.registry().len(), 1);
    }
}
