//! Broker integration tests over the in-memory transport.
//!
//! Covers the request/response correlation properties: bounded collect,
//! at-most-once result delivery, pending-ledger lifecycle, liveness
//! classification, and dispatch-loop resilience to poison messages.

#![allow(clippy::unwrap_used)]

use async_trait::async_trait;
use hivemind_broker::{Broker, MemoryTransport, MessageHandler, Transport};
use hivemind_core::{HivemindResult, Message, SwarmConfig};
use parking_lot::Mutex;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

fn broker_named(transport: &Arc<MemoryTransport>, name: &str) -> Arc<Broker> {
    Arc::new(Broker::new(
        transport.clone(),
        name,
        SwarmConfig::default(),
    ))
}

struct Recorder {
    seen: Arc<Mutex<Vec<Message>>>,
}

#[async_trait]
impl MessageHandler for Recorder {
    async fn handle(&self, message: Message) -> HivemindResult<()> {
        self.seen.lock().push(message);
        Ok(())
    }
}

struct Exploder;

#[async_trait]
impl MessageHandler for Exploder {
    async fn handle(&self, _message: Message) -> HivemindResult<()> {
        Err(hivemind_core::HivemindError::Worker("boom".into()))
    }
}

#[tokio::test(start_paused = true)]
async fn collect_returns_none_when_no_result_within_timeout() {
    let transport = Arc::new(MemoryTransport::new());
    let broker = broker_named(&transport, "orchestrator");

    let collected = broker
        .collect("missing-task", Duration::from_secs(3))
        .await
        .unwrap();
    assert!(collected.is_none());
}

#[tokio::test]
async fn collect_returns_immediately_when_result_pre_exists() {
    let transport = Arc::new(MemoryTransport::new());
    let orchestrator = broker_named(&transport, "orchestrator");
    let worker = broker_named(&transport, "coder");

    worker
        .store_result("task-1", json!({"answer": 42}), "success")
        .await
        .unwrap();

    let collected = orchestrator
        .collect("task-1", Duration::from_secs(1))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(collected.id, "task-1");
    assert_eq!(collected.payload_str("status"), Some("success"));
    assert_eq!(collected.payload["result"]["answer"], 42);
}

#[tokio::test(start_paused = true)]
async fn collect_observes_a_result_exactly_once() {
    let transport = Arc::new(MemoryTransport::new());
    let orchestrator = broker_named(&transport, "orchestrator");
    let worker = broker_named(&transport, "coder");

    worker
        .store_result("task-1", json!("done"), "success")
        .await
        .unwrap();

    let first = orchestrator
        .collect("task-1", Duration::from_secs(1))
        .await
        .unwrap();
    assert!(first.is_some());

    let second = orchestrator
        .collect("task-1", Duration::from_secs(1))
        .await
        .unwrap();
    assert!(second.is_none(), "record must be deleted after first read");
}

#[tokio::test]
async fn publish_succeeds_with_no_subscriber_and_records_pending() {
    let transport = Arc::new(MemoryTransport::new());
    let broker = broker_named(&transport, "orchestrator");

    let message = Message::task("orchestrator", "coder").with_entry("instruction", json!("go"));
    let id = broker.publish("coder", &message).await.unwrap();
    assert_eq!(id, message.id);

    let pending = broker.pending_task(&id).await.unwrap().unwrap();
    assert_eq!(pending.task_id, id);
    assert_eq!(pending.channel, "coder");
}

#[tokio::test]
async fn store_result_clears_the_pending_ledger() {
    let transport = Arc::new(MemoryTransport::new());
    let orchestrator = broker_named(&transport, "orchestrator");
    let worker = broker_named(&transport, "coder");

    let message = Message::task("orchestrator", "coder");
    let id = orchestrator.publish("coder", &message).await.unwrap();
    assert!(orchestrator.pending_task(&id).await.unwrap().is_some());

    worker
        .store_result(&id, json!("ok"), "success")
        .await
        .unwrap();
    assert!(orchestrator.pending_task(&id).await.unwrap().is_none());

    // A second deletion path firing is a no-op, not an error.
    assert!(orchestrator
        .collect(&id, Duration::from_secs(1))
        .await
        .unwrap()
        .is_some());
}

#[tokio::test]
async fn health_check_classifies_fresh_stale_and_unreadable() {
    let transport = Arc::new(MemoryTransport::new());
    let broker = broker_named(&transport, "orchestrator");

    broker.heartbeat().await.unwrap();

    let stale = (chrono::Utc::now().timestamp() - 60).to_string();
    transport
        .set("swarm:heartbeat:stale-worker", stale.into_bytes(), None)
        .await
        .unwrap();
    transport
        .set(
            "swarm:heartbeat:garbled-worker",
            b"not-a-timestamp".to_vec(),
            None,
        )
        .await
        .unwrap();

    let report = broker.health_check().await.unwrap();
    assert_eq!(report.total, 3);
    assert_eq!(report.healthy, 1);
    assert_eq!(report.unhealthy, 2);

    let status_of = |name: &str| {
        report
            .workers
            .iter()
            .find(|w| w.name == name)
            .map(|w| w.status)
            .unwrap()
    };
    assert_eq!(
        status_of("orchestrator"),
        hivemind_broker::LivenessStatus::Alive
    );
    assert_eq!(
        status_of("stale-worker"),
        hivemind_broker::LivenessStatus::Dead
    );
    assert_eq!(
        status_of("garbled-worker"),
        hivemind_broker::LivenessStatus::Unknown
    );
}

#[tokio::test]
async fn health_check_omits_workers_with_no_heartbeat_key() {
    let transport = Arc::new(MemoryTransport::new());
    let broker = broker_named(&transport, "orchestrator");
    let report = broker.health_check().await.unwrap();
    assert_eq!(report.total, 0);
    assert!(report.workers.is_empty());
}

#[tokio::test(start_paused = true)]
async fn dispatch_loop_survives_poison_messages_and_handler_errors() {
    let transport = Arc::new(MemoryTransport::new());
    let broker = broker_named(&transport, "coder");

    let seen = Arc::new(Mutex::new(Vec::new()));
    broker
        .subscribe(&["tasks"], Arc::new(Recorder { seen: seen.clone() }))
        .await
        .unwrap();
    broker
        .subscribe(&["broadcast"], Arc::new(Exploder))
        .await
        .unwrap();

    let listener = {
        let broker = broker.clone();
        tokio::spawn(async move { broker.listen().await })
    };

    // Poison bytes, then a handler error, then a valid task: the loop must
    // outlive all three.
    transport
        .publish("swarm:tasks:coder", b"{ not json".to_vec())
        .await
        .unwrap();
    transport
        .publish(
            "swarm:broadcast",
            Message::broadcast("orchestrator").encode().unwrap(),
        )
        .await
        .unwrap();
    let task = Message::task("orchestrator", "coder").with_entry("instruction", json!("survive"));
    transport
        .publish("swarm:tasks:coder", task.encode().unwrap())
        .await
        .unwrap();

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(seen.lock().len(), 1);
    assert_eq!(seen.lock()[0].payload_str("instruction"), Some("survive"));

    broker.stop();
    listener.await.unwrap().unwrap();
}

#[tokio::test(start_paused = true)]
async fn resubscribing_replaces_the_handler() {
    let transport = Arc::new(MemoryTransport::new());
    let broker = broker_named(&transport, "coder");

    let first = Arc::new(Mutex::new(Vec::new()));
    let second = Arc::new(Mutex::new(Vec::new()));
    broker
        .subscribe(&["tasks"], Arc::new(Recorder { seen: first.clone() }))
        .await
        .unwrap();
    broker
        .subscribe(
            &["tasks"],
            Arc::new(Recorder {
                seen: second.clone(),
            }),
        )
        .await
        .unwrap();

    let listener = {
        let broker = broker.clone();
        tokio::spawn(async move { broker.listen().await })
    };

    let task = Message::task("orchestrator", "coder");
    transport
        .publish("swarm:tasks:coder", task.encode().unwrap())
        .await
        .unwrap();

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(first.lock().is_empty());
    assert_eq!(second.lock().len(), 1);

    broker.stop();
    listener.await.unwrap().unwrap();
}

#[tokio::test]
async fn shared_state_round_trips_json_and_falls_back_to_raw_text() {
    let transport = Arc::new(MemoryTransport::new());
    let broker = broker_named(&transport, "orchestrator");

    broker
        .set_state("plan", &json!({"phase": 2}), None)
        .await
        .unwrap();
    assert_eq!(
        broker.get_state("plan").await.unwrap().unwrap()["phase"],
        2
    );

    transport
        .set("swarm:state:note", b"plain text".to_vec(), None)
        .await
        .unwrap();
    assert_eq!(
        broker.get_state("note").await.unwrap().unwrap(),
        json!("plain text")
    );

    assert!(broker.get_state("absent").await.unwrap().is_none());
}

#[tokio::test(start_paused = true)]
async fn broadcast_reaches_every_subscribed_agent() {
    let transport = Arc::new(MemoryTransport::new());
    let orchestrator = broker_named(&transport, "orchestrator");
    let coder = broker_named(&transport, "coder");
    let tester = broker_named(&transport, "tester");

    let coder_seen = Arc::new(Mutex::new(Vec::new()));
    let tester_seen = Arc::new(Mutex::new(Vec::new()));
    coder
        .subscribe(
            &["broadcast"],
            Arc::new(Recorder {
                seen: coder_seen.clone(),
            }),
        )
        .await
        .unwrap();
    tester
        .subscribe(
            &["broadcast"],
            Arc::new(Recorder {
                seen: tester_seen.clone(),
            }),
        )
        .await
        .unwrap();

    let coder_loop = {
        let coder = coder.clone();
        tokio::spawn(async move { coder.listen().await })
    };
    let tester_loop = {
        let tester = tester.clone();
        tokio::spawn(async move { tester.listen().await })
    };

    orchestrator.broadcast("pause", "maintenance").await.unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;

    assert_eq!(coder_seen.lock().len(), 1);
    assert_eq!(tester_seen.lock().len(), 1);
    assert_eq!(coder_seen.lock()[0].payload_str("action"), Some("pause"));

    coder.stop();
    tester.stop();
    coder_loop.await.unwrap().unwrap();
    tester_loop.await.unwrap().unwrap();
}
