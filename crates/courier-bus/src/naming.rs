//! Queue and topic naming conventions.
//!
//! Names are derived purely and deterministically from type identities. The
//! convention must keep distinct handlers on distinct queues and separable
//! message types on distinct topics; a colliding convention is a
//! configuration defect the core cannot detect at runtime.

use courier_types::TypeIdentity;

/// Maps a handler identity to the queue its listener consumes.
pub trait QueueNaming: Send + Sync {
    /// Queue name for a handler identity.
    fn queue_name(&self, handler: TypeIdentity) -> String;
}

/// Maps a message identity to the topic it is published under.
pub trait TopicNaming: Send + Sync {
    /// Topic name for a message identity.
    fn topic_name(&self, message: TypeIdentity) -> String;
}

/// Default convention: the identity's string form with Rust path separators
/// replaced by dots, e.g. `orders::OrderHandler` becomes
/// `orders.OrderHandler`.
///
/// Injective over distinct string forms, so distinct identities never share
/// a name.
#[derive(Debug, Clone, Copy, Default)]
pub struct DottedNaming;

impl DottedNaming {
    fn format(identity: TypeIdentity) -> String {
        identity.full_name().replace("::", ".")
    }
}

impl QueueNaming for DottedNaming {
    fn queue_name(&self, handler: TypeIdentity) -> String {
        Self::format(handler)
    }
}

impl TopicNaming for DottedNaming {
    fn topic_name(&self, message: TypeIdentity) -> String {
        Self::format(message)
    }
}
