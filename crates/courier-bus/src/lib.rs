//! # Courier Bus - Transport-Agnostic Message Dispatch
//!
//! The dispatch core of a process-local message bus. It binds registered
//! message handlers to a transport, starts one listener per handler, routes
//! each inbound envelope to the processor for its exact message type, and
//! provides the outbound publish path.
//!
//! ## Architecture
//!
//! ```text
//! ┌────────────────┐ start_listener(queue, topics, callback) ┌───────────┐
//! │   MessageBus   │ ────────────────────────────────────────→ Transport │
//! │                │                                          │          │
//! │   publish() ───┼──→ scope → publisher → send(topic) ─────→│          │
//! └────────────────┘                                          └─────┬────┘
//!          ↑                                                        │
//!   HandlerRegistry                 ┌──────────────────┐   envelope │
//!   (one descriptor                 │ DispatchCallback │←───────────┘
//!    per handler)                   │ match → scope →  │
//!                                   │ processor        │
//!                                   └──────────────────┘
//! ```
//!
//! ## Isolation Guarantees
//!
//! - One resolution scope per unit of work (delivery or publish), never
//!   shared, never reused, dropped on every exit path.
//! - The only state shared across units of work is the root [`ScopeFactory`];
//!   the shipped [`DispatchTable`] is immutable after composition.
//! - No ordering across distinct deliveries or publishes; ordering, retries,
//!   and delivery outcomes belong to the transport.

pub mod builder;
pub mod bus;
pub mod dispatch;
pub mod memory;
pub mod naming;
pub mod processor;
pub mod publisher;
pub mod registry;
pub mod scope;
pub mod transport;

// Re-export main types
pub use builder::{BuildError, BusBuilder, HandlerRegistration};
pub use bus::{ListenerFailure, MessageBus, StartError};
pub use dispatch::{dispatch, make_callback, DispatchError};
pub use memory::{MemoryTransport, MemoryTransportConfig};
pub use naming::{DottedNaming, QueueNaming, TopicNaming};
pub use processor::{MessageProcessor, TypedProcessor};
pub use publisher::{MessagePublisher, PublishError, TransportPublisher};
pub use registry::{HandlerDescriptor, HandlerRegistry, RegistryError};
pub use scope::{
    DispatchTable, ProcessorFactory, PublisherFactory, ResolutionScope, ResolveError,
    ScopeFactory, TableScopeFactory,
};
pub use transport::{
    DispatchCallback, DispatchFuture, ListenerHandle, Transport, TransportError,
};

/// Default per-queue delivery channel capacity for the in-memory transport.
pub const DEFAULT_DELIVERY_CAPACITY: usize = 256;
