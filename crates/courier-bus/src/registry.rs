//! Handler registration records and the immutable registry.
//!
//! Descriptors are created once at composition time and never mutated; the
//! registry is the process-lifetime list the orchestrator iterates at start.
//! Registry construction validates every descriptor, so structurally
//! detectable defects fail composition instead of individual deliveries.

use std::sync::Arc;

use thiserror::Error;

use courier_types::TypeIdentity;

use crate::dispatch::DispatchError;

/// Errors raised while validating handler registrations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RegistryError {
    /// A handler was registered without any accepted message types.
    #[error("handler {handler} accepts no message types")]
    EmptyMessageSet {
        /// String form of the handler's identity.
        handler: &'static str,
    },

    /// The same message identity appears twice in one descriptor, by runtime
    /// id or by string form.
    #[error("handler {handler} registers message type {message_type} more than once")]
    DuplicateMessageType {
        /// String form of the handler's identity.
        handler: &'static str,
        /// String form of the duplicated message identity.
        message_type: &'static str,
    },
}

/// Static registration record pairing a handler identity with the message
/// identities it can process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandlerDescriptor {
    handler: TypeIdentity,
    messages: Vec<TypeIdentity>,
}

impl HandlerDescriptor {
    /// Create a descriptor.
    ///
    /// The record itself is a plain pairing; [`HandlerRegistry::new`]
    /// enforces the message-set invariants before a descriptor reaches the
    /// dispatch path.
    #[must_use]
    pub fn new(handler: TypeIdentity, messages: Vec<TypeIdentity>) -> Self {
        Self { handler, messages }
    }

    /// The handler's identity.
    #[must_use]
    pub fn handler(&self) -> TypeIdentity {
        self.handler
    }

    /// The message identities this handler accepts.
    #[must_use]
    pub fn messages(&self) -> &[TypeIdentity] {
        &self.messages
    }

    /// Resolve the single accepted identity whose string form equals
    /// `message_type`.
    ///
    /// Zero matches is an unsupported type. More than one is a registry
    /// defect surfaced as an error: invoking the first match would silently
    /// run the wrong processor.
    pub fn match_message_type(&self, message_type: &str) -> Result<TypeIdentity, DispatchError> {
        let mut matches = self
            .messages
            .iter()
            .filter(|identity| identity.full_name() == message_type);

        let Some(first) = matches.next() else {
            return Err(DispatchError::UnsupportedMessageType {
                handler: self.handler.full_name(),
                message_type: message_type.to_string(),
            });
        };
        if matches.next().is_some() {
            return Err(DispatchError::AmbiguousMessageType {
                handler: self.handler.full_name(),
                message_type: message_type.to_string(),
            });
        }
        Ok(*first)
    }

    fn validate(&self) -> Result<(), RegistryError> {
        if self.messages.is_empty() {
            return Err(RegistryError::EmptyMessageSet {
                handler: self.handler.full_name(),
            });
        }
        for (index, message) in self.messages.iter().enumerate() {
            let duplicate = self.messages[..index].iter().any(|seen| {
                seen.type_id() == message.type_id() || seen.full_name() == message.full_name()
            });
            if duplicate {
                return Err(RegistryError::DuplicateMessageType {
                    handler: self.handler.full_name(),
                    message_type: message.full_name(),
                });
            }
        }
        Ok(())
    }
}

/// Immutable, process-lifetime list of handler descriptors.
#[derive(Debug, Clone, Default)]
pub struct HandlerRegistry {
    descriptors: Vec<Arc<HandlerDescriptor>>,
}

impl HandlerRegistry {
    /// Build a registry, validating every descriptor.
    pub fn new(descriptors: Vec<HandlerDescriptor>) -> Result<Self, RegistryError> {
        for descriptor in &descriptors {
            descriptor.validate()?;
        }
        Ok(Self {
            descriptors: descriptors.into_iter().map(Arc::new).collect(),
        })
    }

    /// Descriptors in registration order.
    #[must_use]
    pub fn descriptors(&self) -> &[Arc<HandlerDescriptor>] {
        &self.descriptors
    }

    /// Number of registered handlers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    /// Whether no handlers are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }
}
