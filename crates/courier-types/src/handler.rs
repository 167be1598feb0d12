//! The user-facing handler contract.

use async_trait::async_trait;
use tokio::sync::watch;

use crate::message::Message;
use crate::BoxError;

/// Handler logic for one message type.
///
/// One handler type may implement this for several message types; each
/// `(handler, message)` pair gets its own processor registration. Handler
/// errors are returned as [`BoxError`] and propagate to the transport
/// unchanged; the bus applies no retry or suppression.
#[async_trait]
pub trait MessageHandler<M: Message>: Send + Sync + 'static {
    /// Process one decoded message.
    ///
    /// `shutdown` flips to `true` when the process is stopping; long-running
    /// handlers should observe it and return promptly.
    async fn handle(&self, message: M, shutdown: watch::Receiver<bool>) -> Result<(), BoxError>;
}
