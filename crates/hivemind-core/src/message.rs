use crate::error::{HivemindError, HivemindResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

/// Kind of a swarm message. Closed enumeration: a wire value outside this
/// set fails to decode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum MessageType {
    /// An instruction dispatched to a worker.
    Task,
    /// A worker's result for a previously dispatched task.
    Result,
    /// A fleet-wide control message (pause, resume, shutdown, status).
    Broadcast,
    /// A status report written by an agent.
    Status,
    /// A liveness signal.
    Heartbeat,
    /// An error report.
    Error,
}

/// Advisory message priority. Carried on the wire, never used for delivery
/// ordering or channel selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    /// Control traffic (broadcasts, shutdown).
    High,
    /// Default for task dispatch.
    Medium,
    /// Background traffic.
    Low,
}

/// Message metadata: advisory priority plus the retention bound for the
/// pending/result records derived from this message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Metadata {
    /// Advisory priority.
    #[serde(default = "default_priority")]
    pub priority: Priority,
    /// How long (milliseconds) a pending/result record derived from this
    /// message may be retained before expiring.
    #[serde(default = "default_ttl_ms")]
    pub ttl: u64,
}

fn default_priority() -> Priority {
    Priority::Medium
}

fn default_ttl_ms() -> u64 {
    300_000
}

impl Default for Metadata {
    fn default() -> Self {
        Self {
            priority: default_priority(),
            ttl: default_ttl_ms(),
        }
    }
}

/// The unit of communication between swarm agents.
///
/// Immutable once constructed. The wire format is a UTF-8 JSON object with
/// the fields below; unknown extra fields are ignored on decode, and the
/// optional fields take documented defaults (`to = ""`, `payload = {}`,
/// `metadata = {priority: medium, ttl: 300000}`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Message kind. Serialized under the wire name `type`.
    #[serde(rename = "type")]
    pub kind: MessageType,
    /// Globally unique identifier. Generated by the sender, except result
    /// messages, which reuse the originating task's id for correlation.
    pub id: String,
    /// Creation time. Informational only, never used for ordering.
    pub timestamp: DateTime<Utc>,
    /// Logical name of the sending endpoint.
    pub from: String,
    /// Logical name of the receiving endpoint. `"*"` or `"broadcast"` is
    /// the fan-to-all address.
    #[serde(default)]
    pub to: String,
    /// Opaque structured data, interpreted by sender and receiver only.
    #[serde(default)]
    pub payload: Map<String, Value>,
    /// Advisory priority and retention bound.
    #[serde(default)]
    pub metadata: Metadata,
}

impl Message {
    /// Creates a message of the given kind with a fresh id, the current
    /// timestamp, an empty payload, and default metadata.
    pub fn new(kind: MessageType, from: impl Into<String>, to: impl Into<String>) -> Self {
        Self {
            kind,
            id: Uuid::new_v4().to_string(),
            timestamp: Utc::now(),
            from: from.into(),
            to: to.into(),
            payload: Map::new(),
            metadata: Metadata::default(),
        }
    }

    /// Creates a TASK message.
    pub fn task(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self::new(MessageType::Task, from, to)
    }

    /// Creates a RESULT message whose id equals the originating task's id,
    /// enabling collection by correlation.
    pub fn result(
        task_id: impl Into<String>,
        from: impl Into<String>,
        to: impl Into<String>,
    ) -> Self {
        Self {
            id: task_id.into(),
            ..Self::new(MessageType::Result, from, to)
        }
    }

    /// Creates a BROADCAST message addressed to every agent: high priority,
    /// 60 second retention.
    pub fn broadcast(from: impl Into<String>) -> Self {
        Self::new(MessageType::Broadcast, from, "*").with_metadata(Metadata {
            priority: Priority::High,
            ttl: 60_000,
        })
    }

    /// Replaces the payload.
    pub fn with_payload(mut self, payload: Map<String, Value>) -> Self {
        self.payload = payload;
        self
    }

    /// Inserts one payload entry.
    pub fn with_entry(mut self, key: impl Into<String>, value: Value) -> Self {
        self.payload.insert(key.into(), value);
        self
    }

    /// Replaces the metadata.
    pub fn with_metadata(mut self, metadata: Metadata) -> Self {
        self.metadata = metadata;
        self
    }

    /// Replaces the id. Used when the id must equal a caller-specified
    /// task id.
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    /// Borrows a payload entry as a string, if present and a string.
    pub fn payload_str(&self, key: &str) -> Option<&str> {
        self.payload.get(key).and_then(Value::as_str)
    }

    /// Serializes to wire bytes (UTF-8 JSON).
    pub fn encode(&self) -> HivemindResult<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }

    /// Deserializes from wire bytes. Unknown extra fields are ignored; an
    /// unknown `type` value or a missing required field fails with
    /// [`HivemindError::Decode`].
    pub fn decode(bytes: &[u8]) -> HivemindResult<Self> {
        serde_json::from_slice(bytes).map_err(|e| HivemindError::Decode(e.to_string()))
    }
}
