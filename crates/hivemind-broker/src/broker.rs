use crate::health::{HealthReport, LivenessStatus, WorkerHealth};
use crate::keys;
use crate::registry::{HandlerRegistry, MessageHandler};
use crate::transport::{Delivery, Transport};
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use hivemind_core::{HivemindResult, Message, SwarmConfig};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch, Mutex};
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

/// Lifecycle of a pending ledger entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PendingStatus {
    /// Published, no result collected yet.
    Pending,
    /// Result observed by a collector.
    Collected,
}

/// Ledger entry created when a task is published.
///
/// One authoritative record with three independent deletion triggers:
/// result collection, result storage, and TTL expiry. Any one firing is
/// sufficient; duplicate deletions are no-ops.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PendingRecord {
    /// Id of the published message.
    pub task_id: String,
    /// Logical destination it was published to.
    pub channel: String,
    /// Ledger status.
    pub status: PendingStatus,
    /// When the transport will expire this record.
    pub expires_at: DateTime<Utc>,
}

/// Addressed, collectible, health-observable messaging over a [`Transport`].
///
/// One broker per process, explicitly constructed and `Arc`-shared; there is
/// no global instance. `name` identifies this process on the wire (message
/// `from` fields, its heartbeat key, its own task channel).
pub struct Broker {
    name: String,
    config: SwarmConfig,
    transport: Arc<dyn Transport>,
    registry: HandlerRegistry,
    inbox_tx: mpsc::UnboundedSender<Delivery>,
    inbox_rx: Mutex<mpsc::UnboundedReceiver<Delivery>>,
    stop_tx: watch::Sender<bool>,
}

impl Broker {
    /// Creates a broker for the named agent over the given transport.
    pub fn new(transport: Arc<dyn Transport>, name: impl Into<String>, config: SwarmConfig) -> Self {
        let (inbox_tx, inbox_rx) = mpsc::unbounded_channel();
        let (stop_tx, _) = watch::channel(false);
        Self {
            name: name.into(),
            config,
            transport,
            registry: HandlerRegistry::new(),
            inbox_tx,
            inbox_rx: Mutex::new(inbox_rx),
            stop_tx,
        }
    }

    /// This process's logical name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The swarm configuration this broker runs under.
    pub fn config(&self) -> &SwarmConfig {
        &self.config
    }

    /// Verifies transport connectivity.
    pub async fn ping(&self) -> HivemindResult<()> {
        self.transport.ping().await
    }

    /// Resolves a logical destination to a concrete channel name:
    /// `"*"`/`"broadcast"` → the global broadcast channel, `"results"` →
    /// the result notification channel, `"tasks"` → this agent's own task
    /// channel, anything else → that destination's task channel.
    pub fn resolve_channel(&self, destination: &str) -> String {
        let ns = &self.config.namespace;
        match destination {
            "*" | "broadcast" => keys::broadcast_channel(ns),
            "results" => keys::results_channel(ns),
            "tasks" => keys::task_channel(ns, &self.name),
            other => keys::task_channel(ns, other),
        }
    }

    /// Publishes a message to a logical destination and records it in the
    /// pending ledger under the message id, with the message's metadata TTL.
    ///
    /// Pub/sub is fire-and-forget: this succeeds even if nothing is
    /// currently subscribed — the pending record is what allows a later
    /// [`Broker::collect`] to wait for the result. Returns the message id.
    pub async fn publish(&self, destination: &str, message: &Message) -> HivemindResult<String> {
        let channel = self.resolve_channel(destination);
        self.transport.publish(&channel, message.encode()?).await?;

        let ttl = Duration::from_millis(message.metadata.ttl);
        let record = PendingRecord {
            task_id: message.id.clone(),
            channel: destination.to_string(),
            status: PendingStatus::Pending,
            expires_at: Utc::now()
                + ChronoDuration::milliseconds(i64::try_from(message.metadata.ttl).unwrap_or(i64::MAX)),
        };
        self.transport
            .set(
                &keys::pending_key(&self.config.namespace, &message.id),
                serde_json::to_vec(&record)?,
                Some(ttl),
            )
            .await?;

        debug!(id = %message.id, channel = %channel, "published");
        Ok(message.id.clone())
    }

    /// Reads the pending ledger entry for a task, if still present.
    pub async fn pending_task(&self, task_id: &str) -> HivemindResult<Option<PendingRecord>> {
        let key = keys::pending_key(&self.config.namespace, task_id);
        match self.transport.get(&key).await? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    /// Registers `handler` against each resolved channel and issues the
    /// underlying subscription.
    ///
    /// Subscribing to a channel that already has a handler replaces it —
    /// last writer wins; the transport subscription is only issued once per
    /// channel, so replacement never causes duplicate delivery.
    pub async fn subscribe(
        &self,
        channels: &[&str],
        handler: Arc<dyn MessageHandler>,
    ) -> HivemindResult<()> {
        let resolved: Vec<String> = channels.iter().map(|c| self.resolve_channel(c)).collect();
        let mut fresh = Vec::with_capacity(resolved.len());
        for channel in &resolved {
            if self.registry.insert(channel.clone(), handler.clone()) {
                warn!(channel = %channel, "handler replaced (last writer wins)");
            } else {
                fresh.push(channel.clone());
            }
        }
        if !fresh.is_empty() {
            self.transport
                .subscribe(&fresh, self.inbox_tx.clone())
                .await?;
        }
        info!(agent = %self.name, channels = ?resolved, "subscribed");
        Ok(())
    }

    /// Runs the dispatch loop: receives envelopes from the transport, looks
    /// up the handler for the channel each arrived on, and invokes it with
    /// the decoded message.
    ///
    /// Single cooperative loop — one poison message can never stop
    /// listening: decode failures and handler errors are logged and
    /// dropped. Terminates only on [`Broker::stop`] or when the transport
    /// closes the subscription stream.
    pub async fn listen(&self) -> HivemindResult<()> {
        let mut inbox = self.inbox_rx.lock().await;
        let mut stop_rx = self.stop_tx.subscribe();
        if *stop_rx.borrow() {
            return Ok(());
        }
        info!(agent = %self.name, "dispatch loop started");

        loop {
            tokio::select! {
                biased;
                _ = stop_rx.changed() => {
                    if *stop_rx.borrow() {
                        break;
                    }
                }
                delivery = inbox.recv() => {
                    match delivery {
                        None => {
                            warn!(agent = %self.name, "subscription stream closed");
                            break;
                        }
                        Some(delivery) => self.dispatch(delivery).await,
                    }
                }
            }
        }

        info!(agent = %self.name, "dispatch loop stopped");
        Ok(())
    }

    async fn dispatch(&self, delivery: Delivery) {
        let message = match Message::decode(&delivery.payload) {
            Ok(message) => message,
            Err(e) => {
                warn!(channel = %delivery.channel, error = %e, "dropping undecodable message");
                return;
            }
        };
        let Some(handler) = self.registry.get(&delivery.channel) else {
            debug!(channel = %delivery.channel, "no handler registered, dropping");
            return;
        };
        if let Err(e) = handler.handle(message).await {
            error!(channel = %delivery.channel, error = %e, "handler failed");
        }
    }

    /// Signals the dispatch loop to stop after the current message.
    pub fn stop(&self) {
        let _ = self.stop_tx.send(true);
    }

    /// Polls for a task's result until found or `timeout` elapses.
    ///
    /// Suspends between probes (bounded interval, configured
    /// `poll_interval`); never spins. On success the result record is
    /// deleted before returning, so the collector observes it at most once;
    /// the pending ledger entry is deleted as well. A timeout returns
    /// `Ok(None)`, never an error.
    pub async fn collect(
        &self,
        task_id: &str,
        timeout: Duration,
    ) -> HivemindResult<Option<Message>> {
        let ns = &self.config.namespace;
        let result_key = keys::result_key(ns, task_id);
        let deadline = Instant::now() + timeout;

        loop {
            if let Some(bytes) = self.transport.get(&result_key).await? {
                self.transport.delete(&result_key).await?;
                self.transport
                    .delete(&keys::pending_key(ns, task_id))
                    .await?;
                let message = Message::decode(&bytes)?;
                debug!(task_id = %task_id, "result collected");
                return Ok(Some(message));
            }

            let now = Instant::now();
            if now >= deadline {
                debug!(task_id = %task_id, "collect timed out");
                return Ok(None);
            }
            let wait = self.config.poll_interval().min(deadline - now);
            tokio::time::sleep(wait).await;
        }
    }

    /// Stores a task's result record (TTL'd), publishes a RESULT
    /// notification on the fixed results channel, and deletes the pending
    /// ledger entry.
    ///
    /// The record and the notification are two delivery paths to the same
    /// result. Arbitration rule: [`Broker::collect`] wins — it deletes the
    /// record; a notification consumer must re-read the record and treats
    /// its absence as already-consumed.
    pub async fn store_result(
        &self,
        task_id: &str,
        result: Value,
        status: &str,
    ) -> HivemindResult<()> {
        let ns = &self.config.namespace;
        let message = Message::result(task_id, &self.name, "orchestrator")
            .with_entry("status", json!(status))
            .with_entry("result", result);
        let encoded = message.encode()?;

        self.transport
            .set(
                &keys::result_key(ns, task_id),
                encoded.clone(),
                Some(self.config.result_ttl()),
            )
            .await?;
        self.transport
            .publish(&keys::results_channel(ns), encoded)
            .await?;
        self.transport
            .delete(&keys::pending_key(ns, task_id))
            .await?;

        debug!(task_id = %task_id, status = %status, "result stored");
        Ok(())
    }

    /// Publishes a fleet-wide control message (high priority, 60s TTL) on
    /// the global broadcast channel. Returns the broadcast's message id.
    pub async fn broadcast(&self, action: &str, note: &str) -> HivemindResult<String> {
        let message = Message::broadcast(&self.name)
            .with_entry("action", json!(action))
            .with_entry("message", json!(note));
        info!(action = %action, "broadcasting");
        self.publish("broadcast", &message).await
    }

    /// Writes/refreshes this process's heartbeat key with a TTL equal to
    /// the liveness window.
    pub async fn heartbeat(&self) -> HivemindResult<()> {
        let key = keys::heartbeat_key(&self.config.namespace, &self.name);
        let stamp = Utc::now().timestamp().to_string().into_bytes();
        self.transport
            .set(&key, stamp, Some(self.config.liveness_window()))
            .await
    }

    /// Enumerates all heartbeat keys and classifies each worker against the
    /// liveness window.
    ///
    /// A worker with no heartbeat key does not appear in the report;
    /// [`LivenessStatus::Unknown`] is returned for a key whose value cannot
    /// be read as a timestamp.
    pub async fn health_check(&self) -> HivemindResult<HealthReport> {
        let ns = &self.config.namespace;
        let now = Utc::now().timestamp();
        let window = i64::try_from(self.config.liveness_window_secs).unwrap_or(i64::MAX);

        let mut workers = Vec::new();
        for key in self.transport.keys(&keys::heartbeat_prefix(ns)).await? {
            let Some(name) = keys::worker_from_heartbeat_key(ns, &key) else {
                continue;
            };
            // The key may expire between enumeration and read; treat that
            // as absent, not unknown.
            let Some(bytes) = self.transport.get(&key).await? else {
                continue;
            };
            let last_seen = std::str::from_utf8(&bytes)
                .ok()
                .and_then(|s| s.trim().parse::<i64>().ok());
            let health = match last_seen {
                Some(seen) => {
                    let age = now - seen;
                    WorkerHealth {
                        name: name.to_string(),
                        status: if age < window {
                            LivenessStatus::Alive
                        } else {
                            LivenessStatus::Dead
                        },
                        last_seen_seconds_ago: age,
                    }
                }
                None => WorkerHealth {
                    name: name.to_string(),
                    status: LivenessStatus::Unknown,
                    last_seen_seconds_ago: -1,
                },
            };
            workers.push(health);
        }

        Ok(HealthReport::from_workers(workers))
    }

    /// Writes a value into the namespaced shared state, optionally TTL'd.
    /// Independent of the task/result protocol.
    pub async fn set_state(
        &self,
        key: &str,
        value: &Value,
        ttl: Option<Duration>,
    ) -> HivemindResult<()> {
        self.transport
            .set(
                &keys::state_key(&self.config.namespace, key),
                serde_json::to_vec(value)?,
                ttl,
            )
            .await
    }

    /// Reads a shared state value. Bytes that are not valid JSON come back
    /// as a JSON string of the raw text.
    pub async fn get_state(&self, key: &str) -> HivemindResult<Option<Value>> {
        let stored = self
            .transport
            .get(&keys::state_key(&self.config.namespace, key))
            .await?;
        Ok(stored.map(|bytes| {
            serde_json::from_slice(&bytes)
                .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
        }))
    }
}

impl std::fmt::Debug for Broker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Broker")
            .field("name", &self.name)
            .field("namespace", &self.config.namespace)
            .finish_non_exhaustive()
    }
}
