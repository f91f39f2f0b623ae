use crate::partition::{partition_chunks, DEFAULT_CHUNK_COUNT};
use crate::planner::{
    extract_plan, planner_system_prompt, ReasoningService, REDUCE_SYSTEM_PROMPT,
    SYNTHESIS_SYSTEM_PROMPT,
};
use crate::types::{
    ExecutionPlan, ExecutionReport, ExecutionStrategy, ReduceReport, SynthesisReport, TaskResult,
    WorkerShortfall,
};
use futures_util::future::join_all;
use hivemind_broker::Broker;
use hivemind_core::{HivemindResult, Message, Metadata, Priority};
use serde_json::{json, Value};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{info, warn};

/// The swarm orchestrator.
///
/// Reaches workers only through the broker; consults the reasoning service
/// for planning and aggregation. Constructed explicitly — no process-wide
/// instance.
pub struct Orchestrator {
    broker: Arc<Broker>,
    reasoning: Arc<dyn ReasoningService>,
}

impl Orchestrator {
    /// Creates an orchestrator over the given broker and reasoning service.
    pub fn new(broker: Arc<Broker>, reasoning: Arc<dyn ReasoningService>) -> Self {
        Self { broker, reasoning }
    }

    /// The broker this orchestrator dispatches through.
    pub fn broker(&self) -> &Arc<Broker> {
        &self.broker
    }

    /// Executes a task under the given strategy and returns one structured
    /// report.
    ///
    /// `Auto` defers the choice to the planner; an explicit strategy
    /// overrides the planned one. `data` feeds map-reduce partitioning and
    /// defaults to the description itself. Sub-task failures and timeouts
    /// degrade the report, they never raise; a transport failure does.
    pub async fn execute(
        &self,
        description: &str,
        strategy: ExecutionStrategy,
        data: Option<Value>,
    ) -> HivemindResult<ExecutionReport> {
        let plan = self.plan(description).await;
        let resolved = match strategy {
            ExecutionStrategy::Auto => match plan.strategy {
                ExecutionStrategy::Auto => ExecutionStrategy::FanOut,
                planned => planned,
            },
            explicit => explicit,
        };

        info!(strategy = %resolved, subtasks = plan.subtasks.len(), "executing");

        match resolved {
            ExecutionStrategy::FanOut | ExecutionStrategy::Auto => {
                self.execute_fan_out(description, &plan).await
            }
            ExecutionStrategy::Pipeline => self.execute_pipeline(description, &plan).await,
            ExecutionStrategy::MapReduce => {
                let data = data.unwrap_or_else(|| json!(description));
                let worker = plan
                    .workers
                    .first()
                    .cloned()
                    .unwrap_or_else(|| self.broker.config().default_worker.clone());
                self.execute_map_reduce(description, &data, &worker).await
            }
        }
    }

    /// Planning phase. Never fails: unusable reasoning output falls back to
    /// a deterministic single-worker plan.
    async fn plan(&self, description: &str) -> ExecutionPlan {
        let config = self.broker.config();
        let system = planner_system_prompt(&config.worker_roles);
        let response = self
            .reasoning
            .complete(&system, &format!("Task: {description}"))
            .await;

        match response {
            Ok(text) => match extract_plan(&text) {
                Some(plan) if !plan.subtasks.is_empty() => plan,
                _ => {
                    warn!("planner returned no usable plan, using fallback");
                    ExecutionPlan::fallback(description, &config.default_worker)
                }
            },
            Err(e) => {
                warn!(error = %e, "planning call failed, using fallback");
                ExecutionPlan::fallback(description, &config.default_worker)
            }
        }
    }

    /// Fan-out: every valid sub-task dispatched in immediate succession,
    /// collected concurrently, each with its own timeout.
    async fn execute_fan_out(
        &self,
        description: &str,
        plan: &ExecutionPlan,
    ) -> HivemindResult<ExecutionReport> {
        let health = self.broker.health_check().await?;
        let alive: HashSet<&str> = health.alive_workers().into_iter().collect();
        let valid: Vec<_> = plan
            .subtasks
            .iter()
            .filter(|s| alive.contains(s.worker.as_str()))
            .collect();

        if valid.is_empty() {
            let requested: Vec<String> =
                plan.subtasks.iter().map(|s| s.worker.clone()).collect();
            warn!(requested = ?requested, available = ?alive, "no planned worker is alive");
            return Ok(ExecutionReport::NoWorkers(WorkerShortfall {
                requested,
                available: alive.into_iter().map(String::from).collect(),
            }));
        }

        let mut dispatched = Vec::with_capacity(valid.len());
        for subtask in valid {
            let instruction = format!(
                "[FAN-OUT] {}\n\nOriginal task: {}",
                subtask.instruction, description
            );
            let message = Message::task(self.broker.name(), &subtask.worker)
                .with_entry("instruction", json!(instruction))
                .with_entry("strategy", json!("fan-out"));
            self.broker.publish(&subtask.worker, &message).await?;
            dispatched.push((message.id, subtask.worker.clone()));
        }

        let timeout = self.broker.config().collect_timeout();
        let collections = dispatched
            .into_iter()
            .map(|(task_id, worker)| self.await_result(task_id, worker, timeout));
        let results: HivemindResult<Vec<TaskResult>> =
            join_all(collections).await.into_iter().collect();

        self.synthesize(description, results?, ExecutionStrategy::FanOut)
            .await
    }

    /// Pipeline: strictly ordered stages, each fed the accumulated context
    /// of earlier successes; the first failure stops the pipeline.
    async fn execute_pipeline(
        &self,
        description: &str,
        plan: &ExecutionPlan,
    ) -> HivemindResult<ExecutionReport> {
        // Compounding context makes downstream stages heavier.
        let timeout = self.broker.config().collect_timeout() * 2;
        let total = plan.subtasks.len();
        let mut accumulated = description.to_string();
        let mut results = Vec::with_capacity(total);

        for (index, subtask) in plan.subtasks.iter().enumerate() {
            let instruction = format!(
                "[PIPELINE STAGE {}/{}]\n\n{}\n\nAccumulated context from earlier stages:\n{}\n\n\
                 Execute your part and return the result for the next stage.",
                index + 1,
                total,
                subtask.instruction,
                accumulated
            );
            let message = Message::task(self.broker.name(), &subtask.worker)
                .with_entry("instruction", json!(instruction))
                .with_entry("strategy", json!("pipeline"))
                .with_entry("stage", json!(index))
                .with_metadata(Metadata {
                    priority: Priority::High,
                    ttl: 300_000,
                });
            self.broker.publish(&subtask.worker, &message).await?;

            let result = self
                .await_result(message.id.clone(), subtask.worker.clone(), timeout)
                .await?;
            let succeeded = result.success;
            if succeeded {
                accumulated.push_str(&format!(
                    "\n\n[{} OUTPUT]:\n{}",
                    subtask.worker.to_uppercase(),
                    serde_json::to_string_pretty(&result.result)?
                ));
            }
            results.push(result);
            if !succeeded {
                warn!(stage = index + 1, total, "pipeline stage failed, stopping");
                break;
            }
        }

        self.synthesize(description, results, ExecutionStrategy::Pipeline)
            .await
    }

    /// Map-reduce: partition, dispatch chunks to one worker role, collect
    /// unordered, reduce over the successes only.
    async fn execute_map_reduce(
        &self,
        description: &str,
        data: &Value,
        worker: &str,
    ) -> HivemindResult<ExecutionReport> {
        let chunks = partition_chunks(data, DEFAULT_CHUNK_COUNT);
        let total = chunks.len();

        let mut dispatched = Vec::with_capacity(total);
        for (index, chunk) in chunks.iter().enumerate() {
            let chunk_text = match chunk {
                Value::String(text) => text.clone(),
                other => serde_json::to_string(other)?,
            };
            let instruction = format!(
                "[MAP-REDUCE CHUNK {}/{}]\n\nTask: {}\n\nProcess this chunk of data:\n{}\n\n\
                 Return a structured JSON result.",
                index + 1,
                total,
                description,
                chunk_text
            );
            let message = Message::task(self.broker.name(), worker)
                .with_entry("instruction", json!(instruction))
                .with_entry("strategy", json!("map-reduce"))
                .with_entry("chunk", json!(index));
            self.broker.publish(worker, &message).await?;
            dispatched.push((message.id, worker.to_string()));
        }

        let timeout = self.broker.config().collect_timeout();
        let collections = dispatched
            .into_iter()
            .map(|(task_id, role)| self.await_result(task_id, role, timeout));
        let results: HivemindResult<Vec<TaskResult>> =
            join_all(collections).await.into_iter().collect();
        let chunk_outputs: Vec<Value> = results?
            .into_iter()
            .filter(|r| r.success)
            .map(|r| r.result)
            .collect();

        self.reduce(description, total, chunk_outputs).await
    }

    /// Collects one sub-task result, mapping a timeout into a degraded
    /// [`TaskResult`]. Transport failures propagate.
    async fn await_result(
        &self,
        task_id: String,
        worker: String,
        timeout: Duration,
    ) -> HivemindResult<TaskResult> {
        let start = Instant::now();
        let collected = self.broker.collect(&task_id, timeout).await?;
        let duration_ms = start.elapsed().as_millis() as u64;

        Ok(match collected {
            Some(message) => TaskResult {
                success: message.payload_str("status") == Some("success"),
                result: message.payload.get("result").cloned().unwrap_or(Value::Null),
                task_id,
                worker,
                duration_ms,
            },
            None => TaskResult {
                success: false,
                result: json!({"error": "timeout"}),
                task_id,
                worker,
                duration_ms,
            },
        })
    }

    /// Synthesis step for fan-out and pipeline: separates successes from
    /// failures and produces a structured summary with a narrative from the
    /// reasoning service. A reasoning failure degrades to a deterministic
    /// summary; the counts are always reported.
    async fn synthesize(
        &self,
        description: &str,
        results: Vec<TaskResult>,
        strategy: ExecutionStrategy,
    ) -> HivemindResult<ExecutionReport> {
        let successful = results.iter().filter(|r| r.success).count();
        let failed: Vec<String> = results
            .iter()
            .filter(|r| !r.success)
            .map(|r| r.worker.clone())
            .collect();

        let results_text = results
            .iter()
            .filter(|r| r.success)
            .map(|r| {
                Ok(format!(
                    "[{}]:\n{}",
                    r.worker.to_uppercase(),
                    serde_json::to_string_pretty(&r.result)?
                ))
            })
            .collect::<HivemindResult<Vec<String>>>()?
            .join("\n\n");

        let prompt = format!(
            "Synthesize the workers' results.\n\nORIGINAL TASK:\n{}\n\nSTRATEGY: {}\n\n\
             WORKER RESULTS:\n{}\n\nFAILED WORKERS: {}",
            description,
            strategy,
            results_text,
            if failed.is_empty() {
                "none".to_string()
            } else {
                failed.join(", ")
            }
        );

        let synthesis = match self.reasoning.complete(SYNTHESIS_SYSTEM_PROMPT, &prompt).await {
            Ok(text) => text,
            Err(e) => {
                warn!(error = %e, "synthesis call failed, using deterministic summary");
                format!(
                    "{} of {} sub-tasks succeeded ({} failed).\n\n{}",
                    successful,
                    results.len(),
                    failed.len(),
                    results_text
                )
            }
        };

        let report = SynthesisReport {
            success: successful > 0,
            strategy,
            workers_consulted: results.len(),
            workers_successful: successful,
            workers_failed: failed.len(),
            synthesis,
            results,
        };
        info!(
            consulted = report.workers_consulted,
            successful = report.workers_successful,
            failed = report.workers_failed,
            "synthesis complete"
        );
        Ok(ExecutionReport::Synthesis(report))
    }

    /// Reduce step for map-reduce: aggregates successful chunk outputs.
    async fn reduce(
        &self,
        description: &str,
        chunks_total: usize,
        chunk_outputs: Vec<Value>,
    ) -> HivemindResult<ExecutionReport> {
        let prompt = format!(
            "TASK: {}\n\nCHUNK RESULTS ({}):\n{}\n\nAggregate all results into one unified answer.",
            description,
            chunk_outputs.len(),
            serde_json::to_string_pretty(&chunk_outputs)?
        );

        let aggregated = match self.reasoning.complete(REDUCE_SYSTEM_PROMPT, &prompt).await {
            Ok(text) => text,
            Err(e) => {
                warn!(error = %e, "reduce call failed, using deterministic summary");
                format!(
                    "{} of {} chunks processed.\n\n{}",
                    chunk_outputs.len(),
                    chunks_total,
                    serde_json::to_string_pretty(&chunk_outputs)?
                )
            }
        };

        let report = ReduceReport {
            success: !chunk_outputs.is_empty(),
            chunks_total,
            chunks_processed: chunk_outputs.len(),
            aggregated,
        };
        info!(
            total = report.chunks_total,
            processed = report.chunks_processed,
            "reduce complete"
        );
        Ok(ExecutionReport::Reduce(report))
    }

    /// Relays a fleet-wide command (`pause`, `resume`, `shutdown`,
    /// `status`) to the broker's broadcast channel.
    pub async fn broadcast(&self, action: &str, note: &str) -> HivemindResult<String> {
        self.broker.broadcast(action, note).await
    }

    /// Fleet liveness snapshot.
    pub async fn health_check(&self) -> HivemindResult<hivemind_broker::HealthReport> {
        self.broker.health_check().await
    }

    /// Broadcasts `shutdown`, waits the configured grace period for workers
    /// to drain in-flight tasks (best-effort, not guaranteed), then stops
    /// the broker.
    pub async fn shutdown(&self) -> HivemindResult<()> {
        info!("shutting down the swarm");
        self.broker.broadcast("shutdown", "swarm shutting down").await?;
        tokio::time::sleep(self.broker.config().shutdown_grace()).await;
        self.broker.stop();
        Ok(())
    }
}
