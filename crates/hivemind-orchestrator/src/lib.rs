//! Swarm orchestrator.
//!
//! Converts a task description into a concrete distributed execution and
//! one synthesized result, tolerant of individual worker failure.
//! Implements the plan → dispatch → synthesize state machine over three
//! execution strategies:
//!
//! - **fan-out** — independent sub-tasks dispatched in parallel,
//! - **pipeline** — sequential stages, each consuming prior outputs,
//! - **map-reduce** — partitioned input processed in parallel, then reduced.
//!
//! Workers are reachable only through the [`hivemind_broker::Broker`]; the
//! planner and synthesis steps consult an injected [`ReasoningService`].

/// The orchestration engine.
pub mod engine;
/// Map-reduce input partitioning.
pub mod partition;
/// Reasoning-service seam and plan extraction.
pub mod planner;
/// Plans, results, and reports.
pub mod types;

pub use engine::Orchestrator;
pub use partition::{partition_chunks, DEFAULT_CHUNK_COUNT};
pub use planner::{extract_plan, ReasoningService};
pub use types::{
    ExecutionPlan, ExecutionReport, ExecutionStrategy, ReduceReport, Subtask, SynthesisReport,
    TaskResult, WorkerShortfall,
};
