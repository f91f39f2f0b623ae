//! Message broker for the Hivemind swarm.
//!
//! Wraps a durable KV + pub/sub [`Transport`] and turns its fire-and-forget
//! delivery into addressed, collectible, health-observable messaging:
//!
//! - addressed publish with a pending-task ledger,
//! - channel subscription with a single cooperative dispatch loop,
//! - request/response correlation via [`Broker::collect`],
//! - worker liveness tracking (heartbeat / health check),
//! - a namespaced shared key/value state facade.
//!
//! The broker is an explicitly constructed value; share it with `Arc` and
//! pass it into orchestrator and worker constructors.

/// Broker operations over a transport.
pub mod broker;
/// Liveness classification types.
pub mod health;
/// Channel and key naming under the swarm namespace.
pub mod keys;
/// In-process transport for tests and single-process deployments.
pub mod memory;
/// Channel → handler table.
pub mod registry;
/// Transport contract.
pub mod transport;

pub use broker::{Broker, PendingRecord, PendingStatus};
pub use health::{HealthReport, LivenessStatus, WorkerHealth};
pub use memory::MemoryTransport;
pub use registry::{HandlerRegistry, MessageHandler};
pub use transport::{Delivery, DeliverySink, Transport};
