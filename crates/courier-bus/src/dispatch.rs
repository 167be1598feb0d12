//! Per-envelope routing: the dispatch callback.

use std::sync::Arc;

use thiserror::Error;
use tokio::sync::watch;
use tracing::debug;

use courier_types::{BoxError, SerializedEnvelope};

use crate::registry::HandlerDescriptor;
use crate::scope::{ResolveError, ScopeFactory};
use crate::transport::DispatchCallback;

/// Errors raised while routing one delivered envelope.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// The envelope's type string matches no accepted message identity.
    #[error("handler {handler} does not support message type {message_type}")]
    UnsupportedMessageType {
        /// String form of the handler's identity.
        handler: &'static str,
        /// The envelope's declared type string.
        message_type: String,
    },

    /// The envelope's type string matches more than one accepted identity.
    ///
    /// A registry defect: invoking the first match would silently run the
    /// wrong processor, so the delivery fails instead.
    #[error("handler {handler} matches message type {message_type} more than once")]
    AmbiguousMessageType {
        /// String form of the handler's identity.
        handler: &'static str,
        /// The envelope's declared type string.
        message_type: String,
    },

    /// The shutdown signal was observed before processing began.
    #[error("dispatch cancelled by shutdown")]
    Cancelled,

    /// No processor could be resolved for the matched pair.
    #[error(transparent)]
    Resolve(#[from] ResolveError),

    /// The processor failed; the inner error is the processor's, unchanged.
    #[error("processing failed: {0}")]
    Processing(#[source] BoxError),
}

/// Route one delivered envelope to its handler's processor.
///
/// Exactly one processor invocation per envelope on success. The scope and
/// everything resolved from it drop on every exit path, including
/// cancellation and task abort.
pub async fn dispatch(
    descriptor: &HandlerDescriptor,
    scopes: &dyn ScopeFactory,
    envelope: SerializedEnvelope,
    shutdown: watch::Receiver<bool>,
) -> Result<(), DispatchError> {
    let message = descriptor.match_message_type(&envelope.message_type)?;

    if *shutdown.borrow() {
        return Err(DispatchError::Cancelled);
    }

    let scope = scopes.create_scope();
    let processor = scope.processor(descriptor.handler(), message)?;

    debug!(
        handler = descriptor.handler().full_name(),
        message_type = %message,
        "dispatching envelope"
    );

    processor
        .process(&envelope, shutdown)
        .await
        .map_err(DispatchError::Processing)
}

/// Bind a descriptor into the callback a listener invokes per delivery.
#[must_use]
pub fn make_callback(
    descriptor: Arc<HandlerDescriptor>,
    scopes: Arc<dyn ScopeFactory>,
) -> DispatchCallback {
    Arc::new(move |envelope, shutdown| {
        let descriptor = Arc::clone(&descriptor);
        let scopes = Arc::clone(&scopes);
        Box::pin(async move { dispatch(&descriptor, scopes.as_ref(), envelope, shutdown).await })
    })
}
