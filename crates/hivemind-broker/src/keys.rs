//! Channel and key naming.
//!
//! Everything the swarm writes to the transport lives under one namespace
//! prefix so unrelated uses of the same store cannot collide:
//!
//! - `{ns}:broadcast` — the global fan-to-all channel,
//! - `{ns}:tasks:{role}` — per-role task delivery channels,
//! - `{ns}:results` — the result notification channel,
//! - `{ns}:results:{task_id}` — per-task result records (TTL'd keys),
//! - `{ns}:pending:{message_id}` — the pending-task ledger,
//! - `{ns}:heartbeat:{worker}` — worker liveness keys,
//! - `{ns}:state:{key}` — the shared state facade.

/// The global broadcast channel.
pub fn broadcast_channel(ns: &str) -> String {
    format!("{ns}:broadcast")
}

/// The fixed result notification channel.
pub fn results_channel(ns: &str) -> String {
    format!("{ns}:results")
}

/// Task delivery channel for a worker role.
pub fn task_channel(ns: &str, role: &str) -> String {
    format!("{ns}:tasks:{role}")
}

/// Result record key for a task.
pub fn result_key(ns: &str, task_id: &str) -> String {
    format!("{ns}:results:{task_id}")
}

/// Pending ledger key for a published message.
pub fn pending_key(ns: &str, message_id: &str) -> String {
    format!("{ns}:pending:{message_id}")
}

/// Heartbeat key for a worker.
pub fn heartbeat_key(ns: &str, worker: &str) -> String {
    format!("{ns}:heartbeat:{worker}")
}

/// Prefix for enumerating all heartbeat keys.
pub fn heartbeat_prefix(ns: &str) -> String {
    format!("{ns}:heartbeat:")
}

/// Shared state key.
pub fn state_key(ns: &str, key: &str) -> String {
    format!("{ns}:state:{key}")
}

/// Extracts the worker name from a heartbeat key, if it is one.
pub fn worker_from_heartbeat_key<'a>(ns: &str, key: &'a str) -> Option<&'a str> {
    key.strip_prefix(&heartbeat_prefix(ns))
}
