//! Resolution scopes and the static dispatch table.
//!
//! A scope is the ownership boundary for one unit of work: everything
//! resolved from it belongs to that delivery or publish alone and drops with
//! it. The root [`ScopeFactory`] is the only object shared across units of
//! work.

use std::any::TypeId;
use std::collections::HashMap;
use std::sync::Arc;

use thiserror::Error;

use courier_types::TypeIdentity;

use crate::processor::MessageProcessor;
use crate::publisher::MessagePublisher;

/// Errors from resolving instances out of a scope.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ResolveError {
    /// No processor factory is registered for the pair.
    #[error("no processor registered for handler {handler} and message type {message_type}")]
    MissingProcessor {
        /// String form of the handler's identity.
        handler: &'static str,
        /// String form of the message identity.
        message_type: &'static str,
    },

    /// No publisher factory is registered.
    #[error("no publisher registered")]
    MissingPublisher,
}

/// Creates one fresh [`ResolutionScope`] per unit of work.
///
/// Implementations must be safe for concurrent use; the scopes they produce
/// are not shared.
pub trait ScopeFactory: Send + Sync {
    /// Open a new scope. The caller owns it for exactly one unit of work.
    fn create_scope(&self) -> Box<dyn ResolutionScope>;
}

/// An isolated set of instances for one delivery or publish.
///
/// Dropping the scope releases it; the bus drops scopes on every exit path.
pub trait ResolutionScope: Send {
    /// Resolve the processor for a `(handler, message)` pair.
    fn processor(
        &self,
        handler: TypeIdentity,
        message: TypeIdentity,
    ) -> Result<Box<dyn MessageProcessor>, ResolveError>;

    /// Resolve the outbound publisher.
    fn publisher(&self) -> Result<Box<dyn MessagePublisher>, ResolveError>;
}

/// Factory for processor instances, one registration per `(handler, message)`
/// pair.
pub type ProcessorFactory = Box<dyn Fn() -> Box<dyn MessageProcessor> + Send + Sync>;

/// Factory for publisher instances.
pub type PublisherFactory = Box<dyn Fn() -> Box<dyn MessagePublisher> + Send + Sync>;

/// Static dispatch table built once at registration time.
///
/// Keyed by `(handler TypeId, message TypeId)`; lookups never touch a lock.
#[derive(Default)]
pub struct DispatchTable {
    processors: HashMap<(TypeId, TypeId), ProcessorFactory>,
    publisher: Option<PublisherFactory>,
}

impl DispatchTable {
    /// Create an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the processor factory for a `(handler, message)` pair.
    ///
    /// A later registration for the same pair replaces the earlier one.
    pub fn register_processor(
        &mut self,
        handler: TypeIdentity,
        message: TypeIdentity,
        factory: ProcessorFactory,
    ) {
        self.processors
            .insert((handler.type_id(), message.type_id()), factory);
    }

    /// Install the publisher factory.
    pub fn set_publisher(&mut self, factory: PublisherFactory) {
        self.publisher = Some(factory);
    }

    /// Whether a processor is registered for the pair.
    #[must_use]
    pub fn has_processor(&self, handler: TypeIdentity, message: TypeIdentity) -> bool {
        self.processors
            .contains_key(&(handler.type_id(), message.type_id()))
    }
}

/// [`ScopeFactory`] over an immutable [`DispatchTable`].
pub struct TableScopeFactory {
    table: Arc<DispatchTable>,
}

impl TableScopeFactory {
    /// Wrap a completed table.
    #[must_use]
    pub fn new(table: DispatchTable) -> Self {
        Self {
            table: Arc::new(table),
        }
    }
}

impl ScopeFactory for TableScopeFactory {
    fn create_scope(&self) -> Box<dyn ResolutionScope> {
        Box::new(TableScope {
            table: Arc::clone(&self.table),
        })
    }
}

struct TableScope {
    table: Arc<DispatchTable>,
}

impl ResolutionScope for TableScope {
    fn processor(
        &self,
        handler: TypeIdentity,
        message: TypeIdentity,
    ) -> Result<Box<dyn MessageProcessor>, ResolveError> {
        let factory = self
            .table
            .processors
            .get(&(handler.type_id(), message.type_id()))
            .ok_or(ResolveError::MissingProcessor {
                handler: handler.full_name(),
                message_type: message.full_name(),
            })?;
        Ok(factory())
    }

    fn publisher(&self) -> Result<Box<dyn MessagePublisher>, ResolveError> {
        let factory = self
            .table
            .publisher
            .as_ref()
            .ok_or(ResolveError::MissingPublisher)?;
        Ok(factory())
    }
}
