//! In-memory transport for process-local use and tests.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use async_trait::async_trait;
use tokio::sync::{mpsc, watch};
use tracing::{debug, warn};

use courier_types::SerializedEnvelope;

use crate::transport::{DispatchCallback, ListenerHandle, Transport, TransportError};
use crate::DEFAULT_DELIVERY_CAPACITY;

/// Configuration for [`MemoryTransport`].
#[derive(Debug, Clone)]
pub struct MemoryTransportConfig {
    /// Capacity of each listener's delivery channel.
    pub delivery_capacity: usize,
}

impl Default for MemoryTransportConfig {
    fn default() -> Self {
        Self {
            delivery_capacity: DEFAULT_DELIVERY_CAPACITY,
        }
    }
}

/// Process-local transport: one mpsc queue per listener with topic to queue
/// bindings.
///
/// Every delivery runs as its own task, so in-flight deliveries to one queue
/// are unbounded and unordered. A failed dispatch is logged at `warn` and the
/// envelope is discarded; there is no retry or dead-letter here.
pub struct MemoryTransport {
    state: RwLock<Bindings>,
    config: MemoryTransportConfig,
}

#[derive(Default)]
struct Bindings {
    queues: HashMap<String, mpsc::Sender<SerializedEnvelope>>,
    topics: HashMap<String, Vec<String>>,
}

impl MemoryTransport {
    /// Create a transport with default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(MemoryTransportConfig::default())
    }

    /// Create a transport with explicit configuration.
    #[must_use]
    pub fn with_config(config: MemoryTransportConfig) -> Self {
        Self {
            state: RwLock::new(Bindings::default()),
            config,
        }
    }

    /// Number of queues currently bound to `topic`.
    #[must_use]
    pub fn bindings_for(&self, topic: &str) -> usize {
        let state = self.state.read().unwrap_or_else(PoisonError::into_inner);
        state.topics.get(topic).map_or(0, Vec::len)
    }
}

impl Default for MemoryTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Transport for MemoryTransport {
    async fn start_listener(
        &self,
        queue: &str,
        topics: &[String],
        on_message: DispatchCallback,
        shutdown: watch::Receiver<bool>,
    ) -> Result<ListenerHandle, TransportError> {
        if *shutdown.borrow() {
            return Err(TransportError::Cancelled);
        }

        let (sender, mut receiver) = mpsc::channel(self.config.delivery_capacity);
        {
            let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
            if state.queues.contains_key(queue) {
                return Err(TransportError::QueueInUse {
                    queue: queue.to_string(),
                });
            }
            state.queues.insert(queue.to_string(), sender);
            for topic in topics {
                state
                    .topics
                    .entry(topic.clone())
                    .or_default()
                    .push(queue.to_string());
            }
        }

        debug!(queue, topics = topics.len(), "listener registered");

        let queue_name = queue.to_string();
        let mut shutdown_rx = shutdown;
        let task = tokio::spawn(async move {
            loop {
                tokio::select! {
                    changed = shutdown_rx.changed() => {
                        if changed.is_err() || *shutdown_rx.borrow() {
                            debug!(queue = %queue_name, "listener stopping");
                            break;
                        }
                    }
                    delivered = receiver.recv() => {
                        let Some(envelope) = delivered else {
                            debug!(queue = %queue_name, "delivery channel closed");
                            break;
                        };
                        let callback = Arc::clone(&on_message);
                        let delivery_shutdown = shutdown_rx.clone();
                        let delivery_queue = queue_name.clone();
                        tokio::spawn(async move {
                            if let Err(error) = callback(envelope, delivery_shutdown).await {
                                warn!(queue = %delivery_queue, %error, "delivery failed");
                            }
                        });
                    }
                }
            }
        });

        Ok(ListenerHandle::new(queue, task))
    }

    async fn send(
        &self,
        topic: &str,
        envelope: SerializedEnvelope,
    ) -> Result<(), TransportError> {
        let senders: Vec<(String, mpsc::Sender<SerializedEnvelope>)> = {
            let state = self.state.read().unwrap_or_else(PoisonError::into_inner);
            let Some(queues) = state.topics.get(topic) else {
                return Err(TransportError::UnroutableTopic {
                    topic: topic.to_string(),
                });
            };
            queues
                .iter()
                .filter_map(|queue| {
                    state
                        .queues
                        .get(queue)
                        .map(|sender| (queue.clone(), sender.clone()))
                })
                .collect()
        };

        for (queue, sender) in senders {
            if sender.send(envelope.clone()).await.is_err() {
                return Err(TransportError::QueueClosed { queue });
            }
        }
        Ok(())
    }
}
