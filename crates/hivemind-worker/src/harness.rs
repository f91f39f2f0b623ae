use async_trait::async_trait;
use chrono::Utc;
use hivemind_broker::{Broker, MessageHandler};
use hivemind_core::{HivemindResult, Message, MessageType};
use serde_json::{json, Map, Value};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

/// Executes one task instruction. The implementation — an LLM call, a
/// subprocess, a rules engine — is outside the harness's concern.
#[async_trait]
pub trait TaskExecutor: Send + Sync {
    /// Runs `instruction` and returns a result value. An error here still
    /// produces a stored result with `success=false`; it never leaves the
    /// task uncollectable.
    async fn execute(&self, instruction: &str, payload: &Map<String, Value>)
        -> HivemindResult<Value>;
}

/// Executor that echoes the instruction back. Useful for wiring checks and
/// single-process demos.
#[derive(Debug, Default)]
pub struct EchoExecutor;

#[async_trait]
impl TaskExecutor for EchoExecutor {
    async fn execute(
        &self,
        instruction: &str,
        _payload: &Map<String, Value>,
    ) -> HivemindResult<Value> {
        Ok(json!({ "echo": instruction }))
    }
}

/// A worker process: one broker, one executor, one task at a time.
///
/// The worker's name is the broker's agent name; its task channel and
/// heartbeat key derive from it.
pub struct Worker {
    broker: Arc<Broker>,
    executor: Arc<dyn TaskExecutor>,
    running: Arc<AtomicBool>,
    paused: Arc<AtomicBool>,
}

impl Worker {
    /// Creates a worker over the given broker and executor.
    pub fn new(broker: Arc<Broker>, executor: Arc<dyn TaskExecutor>) -> Self {
        Self {
            broker,
            executor,
            running: Arc::new(AtomicBool::new(false)),
            paused: Arc::new(AtomicBool::new(false)),
        }
    }

    /// The worker's logical name.
    pub fn name(&self) -> &str {
        self.broker.name()
    }

    /// Whether the dispatch loop is live.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Whether the worker is paused by a fleet broadcast.
    pub fn is_paused(&self) -> bool {
        self.paused.load(Ordering::SeqCst)
    }

    /// Runs the harness until a `shutdown` broadcast or transport failure:
    /// registers in shared state, subscribes to the task and broadcast
    /// channels, starts the heartbeat loop, then enters the dispatch loop.
    pub async fn run(&self) -> HivemindResult<()> {
        self.broker.ping().await?;
        self.running.store(true, Ordering::SeqCst);

        let name = self.broker.name().to_string();
        self.broker
            .set_state(
                &format!("workers:{name}"),
                &json!({"status": "online", "started_at": Utc::now().to_rfc3339()}),
                None,
            )
            .await?;

        let dispatcher = Arc::new(Dispatcher {
            broker: self.broker.clone(),
            executor: self.executor.clone(),
            running: self.running.clone(),
            paused: self.paused.clone(),
        });
        self.broker
            .subscribe(&["tasks", "broadcast"], dispatcher)
            .await?;

        self.broker.heartbeat().await?;
        let heartbeat = tokio::spawn(heartbeat_loop(
            self.broker.clone(),
            self.running.clone(),
        ));

        info!(worker = %name, "worker started");
        let listened = self.broker.listen().await;

        self.running.store(false, Ordering::SeqCst);
        heartbeat.abort();
        if let Err(e) = self
            .broker
            .set_state(&format!("workers:{name}"), &json!({"status": "offline"}), None)
            .await
        {
            warn!(worker = %name, error = %e, "could not record offline state");
        }
        info!(worker = %name, "worker stopped");
        listened
    }
}

/// Refreshes the heartbeat key until the running flag drops. A transport
/// failure here is fatal to the loop, not retried.
async fn heartbeat_loop(broker: Arc<Broker>, running: Arc<AtomicBool>) {
    let interval = broker.config().heartbeat_interval();
    loop {
        tokio::time::sleep(interval).await;
        if !running.load(Ordering::SeqCst) {
            break;
        }
        if let Err(e) = broker.heartbeat().await {
            error!(error = %e, "heartbeat failed, stopping heartbeat loop");
            break;
        }
    }
}

/// Routes task and broadcast messages for one worker.
struct Dispatcher {
    broker: Arc<Broker>,
    executor: Arc<dyn TaskExecutor>,
    running: Arc<AtomicBool>,
    paused: Arc<AtomicBool>,
}

#[async_trait]
impl MessageHandler for Dispatcher {
    async fn handle(&self, message: Message) -> HivemindResult<()> {
        match message.kind {
            MessageType::Task => self.handle_task(message).await,
            MessageType::Broadcast => self.handle_broadcast(&message).await,
            MessageType::Result
            | MessageType::Status
            | MessageType::Heartbeat
            | MessageType::Error => {
                debug!(kind = ?message.kind, "ignoring non-task message");
                Ok(())
            }
        }
    }
}

impl Dispatcher {
    async fn handle_task(&self, message: Message) -> HivemindResult<()> {
        let task_id = message.id.clone();

        // A paused worker still acknowledges the task so the collector is
        // not left waiting out its full timeout.
        if self.paused.load(Ordering::SeqCst) {
            warn!(task_id = %task_id, "task received while paused");
            return self
                .broker
                .store_result(&task_id, json!({"error": "paused"}), "failed")
                .await;
        }

        let instruction = message.payload_str("instruction").unwrap_or_default();
        info!(task_id = %task_id, "task received");
        let start = Instant::now();

        match self.executor.execute(instruction, &message.payload).await {
            Ok(value) => {
                info!(
                    task_id = %task_id,
                    duration_ms = start.elapsed().as_millis() as u64,
                    "task succeeded"
                );
                self.broker.store_result(&task_id, value, "success").await
            }
            Err(e) => {
                error!(task_id = %task_id, error = %e, "task failed");
                self.broker
                    .store_result(&task_id, json!({"error": e.to_string()}), "failed")
                    .await
            }
        }
    }

    async fn handle_broadcast(&self, message: &Message) -> HivemindResult<()> {
        let action = message.payload_str("action").unwrap_or_default();
        match action {
            "shutdown" => {
                info!(worker = %self.broker.name(), "shutdown broadcast received");
                self.running.store(false, Ordering::SeqCst);
                self.broker.stop();
            }
            "pause" => {
                info!(worker = %self.broker.name(), "paused");
                self.paused.store(true, Ordering::SeqCst);
            }
            "resume" => {
                info!(worker = %self.broker.name(), "resumed");
                self.paused.store(false, Ordering::SeqCst);
            }
            "status" => {
                // Status goes into shared state, not back over the channel.
                let name = self.broker.name().to_string();
                self.broker
                    .set_state(
                        &format!("workers:{name}:status"),
                        &json!({
                            "running": self.running.load(Ordering::SeqCst),
                            "paused": self.paused.load(Ordering::SeqCst),
                            "reported_at": Utc::now().to_rfc3339(),
                        }),
                        None,
                    )
                    .await?;
            }
            other => debug!(action = %other, "ignoring unknown broadcast action"),
        }
        Ok(())
    }
}
