//! Worker harness for the Hivemind swarm.
//!
//! The generic loop every worker process runs: register in shared state,
//! subscribe to the own task channel and the global broadcast channel,
//! heartbeat periodically, handle one task at a time, always store a
//! result, and react to fleet-wide control broadcasts. The per-task logic
//! itself is delegated to a [`TaskExecutor`] implementation.

/// The harness and its executor seam.
pub mod harness;

pub use harness::{EchoExecutor, TaskExecutor, Worker};
