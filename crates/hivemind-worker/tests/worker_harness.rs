//! Worker harness tests over the in-memory transport.
//!
//! Covers the harness contract: results are always stored (success or
//! failure), heartbeats register the worker as alive, and control
//! broadcasts (pause/resume/status/shutdown) take effect.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use async_trait::async_trait;
use hivemind_broker::{Broker, MemoryTransport};
use hivemind_core::{HivemindError, HivemindResult, Message, SwarmConfig};
use hivemind_worker::{EchoExecutor, TaskExecutor, Worker};
use serde_json::{json, Map, Value};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

struct FailingExecutor;

#[async_trait]
impl TaskExecutor for FailingExecutor {
    async fn execute(
        &self,
        _instruction: &str,
        _payload: &Map<String, Value>,
    ) -> HivemindResult<Value> {
        Err(HivemindError::Worker("deliberate failure".into()))
    }
}

fn broker_named(transport: &Arc<MemoryTransport>, name: &str) -> Arc<Broker> {
    Arc::new(Broker::new(
        transport.clone(),
        name,
        SwarmConfig::default(),
    ))
}

fn spawn_worker(
    transport: &Arc<MemoryTransport>,
    name: &str,
    executor: Arc<dyn TaskExecutor>,
) -> (Arc<Worker>, JoinHandle<HivemindResult<()>>) {
    let worker = Arc::new(Worker::new(broker_named(transport, name), executor));
    let handle = {
        let worker = worker.clone();
        tokio::spawn(async move { worker.run().await })
    };
    (worker, handle)
}

async fn settle() {
    tokio::time::sleep(Duration::from_millis(50)).await;
}

#[tokio::test(start_paused = true)]
async fn worker_executes_task_and_stores_success() {
    let transport = Arc::new(MemoryTransport::new());
    let orchestrator = broker_named(&transport, "orchestrator");
    let (_worker, handle) = spawn_worker(&transport, "coder", Arc::new(EchoExecutor));
    settle().await;

    let task =
        Message::task("orchestrator", "coder").with_entry("instruction", json!("write tests"));
    let id = orchestrator.publish("coder", &task).await.unwrap();

    let collected = orchestrator
        .collect(&id, Duration::from_secs(5))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(collected.payload_str("status"), Some("success"));
    assert_eq!(collected.payload["result"]["echo"], "write tests");

    orchestrator.broadcast("shutdown", "").await.unwrap();
    handle.await.unwrap().unwrap();
}

#[tokio::test(start_paused = true)]
async fn failed_execution_still_stores_a_result() {
    let transport = Arc::new(MemoryTransport::new());
    let orchestrator = broker_named(&transport, "orchestrator");
    let (_worker, handle) = spawn_worker(&transport, "coder", Arc::new(FailingExecutor));
    settle().await;

    let task = Message::task("orchestrator", "coder").with_entry("instruction", json!("explode"));
    let id = orchestrator.publish("coder", &task).await.unwrap();

    let collected = orchestrator
        .collect(&id, Duration::from_secs(5))
        .await
        .unwrap()
        .expect("a failed task must still be collectable");
    assert_eq!(collected.payload_str("status"), Some("failed"));
    assert!(collected.payload["result"]["error"]
        .as_str()
        .unwrap()
        .contains("deliberate failure"));

    orchestrator.broadcast("shutdown", "").await.unwrap();
    handle.await.unwrap().unwrap();
}

#[tokio::test(start_paused = true)]
async fn worker_registers_heartbeat_and_state_on_start() {
    let transport = Arc::new(MemoryTransport::new());
    let orchestrator = broker_named(&transport, "orchestrator");
    let (_worker, handle) = spawn_worker(&transport, "analyst", Arc::new(EchoExecutor));
    settle().await;

    let report = orchestrator.health_check().await.unwrap();
    assert_eq!(report.alive_workers(), vec!["analyst"]);

    let state = orchestrator
        .get_state("workers:analyst")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(state["status"], "online");

    orchestrator.broadcast("shutdown", "").await.unwrap();
    handle.await.unwrap().unwrap();
}

#[tokio::test(start_paused = true)]
async fn shutdown_broadcast_stops_the_dispatch_loop() {
    let transport = Arc::new(MemoryTransport::new());
    let orchestrator = broker_named(&transport, "orchestrator");
    let (worker, handle) = spawn_worker(&transport, "coder", Arc::new(EchoExecutor));
    settle().await;
    assert!(worker.is_running());

    orchestrator.broadcast("shutdown", "maintenance").await.unwrap();
    settle().await;

    assert!(!worker.is_running());
    handle.await.unwrap().unwrap();

    let state = orchestrator
        .get_state("workers:coder")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(state["status"], "offline");
}

#[tokio::test(start_paused = true)]
async fn paused_worker_acknowledges_tasks_until_resumed() {
    let transport = Arc::new(MemoryTransport::new());
    let orchestrator = broker_named(&transport, "orchestrator");
    let (worker, handle) = spawn_worker(&transport, "coder", Arc::new(EchoExecutor));
    settle().await;

    orchestrator.broadcast("pause", "").await.unwrap();
    settle().await;
    assert!(worker.is_paused());

    let task = Message::task("orchestrator", "coder").with_entry("instruction", json!("held"));
    let id = orchestrator.publish("coder", &task).await.unwrap();
    let collected = orchestrator
        .collect(&id, Duration::from_secs(5))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(collected.payload_str("status"), Some("failed"));
    assert_eq!(collected.payload["result"]["error"], "paused");

    orchestrator.broadcast("resume", "").await.unwrap();
    settle().await;
    assert!(!worker.is_paused());

    let task = Message::task("orchestrator", "coder").with_entry("instruction", json!("resumed"));
    let id = orchestrator.publish("coder", &task).await.unwrap();
    let collected = orchestrator
        .collect(&id, Duration::from_secs(5))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(collected.payload_str("status"), Some("success"));

    orchestrator.broadcast("shutdown", "").await.unwrap();
    handle.await.unwrap().unwrap();
}

#[tokio::test(start_paused = true)]
async fn status_broadcast_writes_shared_state_not_the_channel() {
    let transport = Arc::new(MemoryTransport::new());
    let orchestrator = broker_named(&transport, "orchestrator");
    let (_worker, handle) = spawn_worker(&transport, "tester", Arc::new(EchoExecutor));
    settle().await;

    orchestrator.broadcast("status", "").await.unwrap();
    settle().await;

    let status = orchestrator
        .get_state("workers:tester:status")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(status["running"], true);
    assert_eq!(status["paused"], false);

    orchestrator.broadcast("shutdown", "").await.unwrap();
    handle.await.unwrap().unwrap();
}
