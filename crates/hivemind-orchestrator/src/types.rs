use serde::{Deserialize, Serialize};
use serde_json::Value;

/// How an orchestrated task is executed across the worker pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ExecutionStrategy {
    /// Independent sub-tasks dispatched in parallel.
    FanOut,
    /// Strictly ordered stages, each consuming prior outputs.
    Pipeline,
    /// Partition input, process chunks in parallel, aggregate.
    MapReduce,
    /// Let the planner choose.
    Auto,
}

impl std::fmt::Display for ExecutionStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExecutionStrategy::FanOut => write!(f, "fan-out"),
            ExecutionStrategy::Pipeline => write!(f, "pipeline"),
            ExecutionStrategy::MapReduce => write!(f, "map-reduce"),
            ExecutionStrategy::Auto => write!(f, "auto"),
        }
    }
}

impl std::str::FromStr for ExecutionStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "fan-out" => Ok(ExecutionStrategy::FanOut),
            "pipeline" => Ok(ExecutionStrategy::Pipeline),
            "map-reduce" => Ok(ExecutionStrategy::MapReduce),
            "auto" => Ok(ExecutionStrategy::Auto),
            other => Err(format!("unknown execution strategy: {other}")),
        }
    }
}

/// One unit of delegated work inside an [`ExecutionPlan`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Subtask {
    /// Worker role the instruction is addressed to.
    pub worker: String,
    /// The instruction itself.
    pub instruction: String,
}

/// Typed execution plan, produced once per orchestrated task and owned by
/// the orchestrator for the duration of one `execute` call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionPlan {
    /// Planned strategy.
    #[serde(default = "ExecutionPlan::default_strategy")]
    pub strategy: ExecutionStrategy,
    /// Worker roles the plan involves.
    #[serde(default)]
    pub workers: Vec<String>,
    /// The decomposed sub-tasks.
    #[serde(default)]
    pub subtasks: Vec<Subtask>,
    /// The planner's explanation of its choice.
    #[serde(default)]
    pub rationale: String,
}

impl ExecutionPlan {
    fn default_strategy() -> ExecutionStrategy {
        ExecutionStrategy::FanOut
    }

    /// Deterministic single-worker plan used when planning fails.
    pub fn fallback(description: &str, worker: &str) -> Self {
        Self {
            strategy: ExecutionStrategy::FanOut,
            workers: vec![worker.to_string()],
            subtasks: vec![Subtask {
                worker: worker.to_string(),
                instruction: description.to_string(),
            }],
            rationale: "fallback: single-worker plan".to_string(),
        }
    }
}

/// Outcome of one collected sub-task. Produced by the collection step,
/// consumed by synthesis/reduce, never persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskResult {
    /// Id of the dispatched task message.
    pub task_id: String,
    /// Worker role it was addressed to.
    pub worker: String,
    /// Whether the worker reported success. A timed-out collection is
    /// recorded here as a failure, never as an error.
    pub success: bool,
    /// The worker's result payload, or `{"error": ...}` on failure.
    pub result: Value,
    /// Wall-clock time from dispatch to collection.
    pub duration_ms: u64,
}

/// Structured summary produced by the synthesis step of fan-out and
/// pipeline executions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SynthesisReport {
    /// True when at least one sub-task succeeded.
    pub success: bool,
    /// Strategy that ran.
    pub strategy: ExecutionStrategy,
    /// Number of sub-tasks dispatched.
    pub workers_consulted: usize,
    /// Sub-tasks that reported success.
    pub workers_successful: usize,
    /// Sub-tasks that failed or timed out.
    pub workers_failed: usize,
    /// Narrative synthesis.
    pub synthesis: String,
    /// Every collected [`TaskResult`], failures included.
    pub results: Vec<TaskResult>,
}

/// Aggregated output of a map-reduce execution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReduceReport {
    /// True when at least one chunk was processed.
    pub success: bool,
    /// Chunks the input was partitioned into.
    pub chunks_total: usize,
    /// Chunks whose results fed the reduce step; failed chunks are simply
    /// omitted.
    pub chunks_processed: usize,
    /// The reducer's aggregated output.
    pub aggregated: String,
}

/// Early termination report: none of the planned workers are alive.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerShortfall {
    /// Workers the plan asked for.
    pub requested: Vec<String>,
    /// Workers currently alive.
    pub available: Vec<String>,
}

/// The result of one `execute` call. Always a normally-returned value —
/// total failure is reported through the counts, never raised.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ExecutionReport {
    /// Fan-out or pipeline synthesis.
    Synthesis(SynthesisReport),
    /// Map-reduce aggregation.
    Reduce(ReduceReport),
    /// No planned worker was alive; nothing was dispatched.
    NoWorkers(WorkerShortfall),
}

impl ExecutionReport {
    /// Borrows the synthesis report, if this is one.
    pub fn as_synthesis(&self) -> Option<&SynthesisReport> {
        match self {
            ExecutionReport::Synthesis(report) => Some(report),
            _ => None,
        }
    }

    /// Borrows the reduce report, if this is one.
    pub fn as_reduce(&self) -> Option<&ReduceReport> {
        match self {
            ExecutionReport::Reduce(report) => Some(report),
            _ => None,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_strategy_wire_names() {
        let json = serde_json::to_string(&ExecutionStrategy::MapReduce).unwrap();
        assert_eq!(json, "\"map-reduce\"");
        let parsed: ExecutionStrategy = serde_json::from_str("\"fan-out\"").unwrap();
        assert_eq!(parsed, ExecutionStrategy::FanOut);
    }

    #[test]
    fn test_strategy_from_str_rejects_unknown() {
        assert!("scatter-gather".parse::<ExecutionStrategy>().is_err());
        assert_eq!(
            "pipeline".parse::<ExecutionStrategy>().unwrap(),
            ExecutionStrategy::Pipeline
        );
    }

    #[test]
    fn test_plan_defaults_for_missing_fields() {
        let plan: ExecutionPlan = serde_json::from_str("{}").unwrap();
        assert_eq!(plan.strategy, ExecutionStrategy::FanOut);
        assert!(plan.subtasks.is_empty());
        assert!(plan.rationale.is_empty());
    }

    #[test]
    fn test_fallback_plan_is_single_worker() {
        let plan = ExecutionPlan::fallback("audit the logs", "analyst");
        assert_eq!(plan.strategy, ExecutionStrategy::FanOut);
        assert_eq!(plan.subtasks.len(), 1);
        assert_eq!(plan.subtasks[0].worker, "analyst");
        assert_eq!(plan.subtasks[0].instruction, "audit the logs");
    }

    #[test]
    fn test_report_serialization_is_tagged() {
        let report = ExecutionReport::NoWorkers(WorkerShortfall {
            requested: vec!["coder".into()],
            available: vec![],
        });
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["outcome"], "no_workers");
        assert_eq!(json["requested"][0], "coder");
    }
}
