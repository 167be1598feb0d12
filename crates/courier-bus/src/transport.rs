//! The transport contract consumed by the bus.
//!
//! A transport owns delivery: queue/topic provisioning, invoking the dispatch
//! callback once per delivered envelope, delivery-outcome handling when the
//! callback fails, and honoring the shutdown signal. The bus never imposes
//! ordering or concurrency bounds across deliveries.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use uuid::Uuid;

use courier_types::SerializedEnvelope;

use crate::dispatch::DispatchError;

/// Errors surfaced by transport operations.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The shutdown signal was observed before the listener registered.
    #[error("shutdown observed before listener registration")]
    Cancelled,

    /// The queue is already bound to a listener.
    #[error("queue {queue} is already bound to a listener")]
    QueueInUse {
        /// The contested queue name.
        queue: String,
    },

    /// No queue is bound to the topic.
    #[error("no queue is bound to topic {topic}")]
    UnroutableTopic {
        /// The unbound topic name.
        topic: String,
    },

    /// The queue's listener stopped accepting deliveries.
    #[error("queue {queue} stopped accepting deliveries")]
    QueueClosed {
        /// The closed queue name.
        queue: String,
    },

    /// A listener registration task stopped before reporting a result.
    #[error("listener registration aborted: {reason}")]
    RegistrationAborted {
        /// Description of the abort.
        reason: String,
    },
}

/// Future returned by one dispatch callback invocation.
pub type DispatchFuture = Pin<Box<dyn Future<Output = Result<(), DispatchError>> + Send>>;

/// Per-delivery callback a listener invokes with each envelope.
pub type DispatchCallback =
    Arc<dyn Fn(SerializedEnvelope, watch::Receiver<bool>) -> DispatchFuture + Send + Sync>;

/// Handle to a running listener.
#[derive(Debug)]
pub struct ListenerHandle {
    id: Uuid,
    queue: String,
    task: JoinHandle<()>,
}

impl ListenerHandle {
    /// Create a handle for a spawned listener task.
    #[must_use]
    pub fn new(queue: impl Into<String>, task: JoinHandle<()>) -> Self {
        Self {
            id: Uuid::new_v4(),
            queue: queue.into(),
            task,
        }
    }

    /// Unique id of this listener.
    #[must_use]
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Queue this listener consumes.
    #[must_use]
    pub fn queue(&self) -> &str {
        &self.queue
    }

    /// Whether the listener task has finished.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Abort the listener task.
    pub fn abort(&self) {
        self.task.abort();
    }
}

/// The external delivery mechanism the bus binds handlers to.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Start a listener consuming `queue`, fed by `topics`, invoking
    /// `on_message` once per delivered envelope.
    ///
    /// The listener must honor `shutdown` and stop promptly once it flips.
    /// What happens when `on_message` fails (ack, retry, dead-letter) is the
    /// transport's decision, not the bus's.
    async fn start_listener(
        &self,
        queue: &str,
        topics: &[String],
        on_message: DispatchCallback,
        shutdown: watch::Receiver<bool>,
    ) -> Result<ListenerHandle, TransportError>;

    /// Hand a serialized envelope to the outbound path for `topic`.
    async fn send(&self, topic: &str, envelope: SerializedEnvelope)
        -> Result<(), TransportError>;
}
