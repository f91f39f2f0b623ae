use crate::error::{HivemindError, HivemindResult};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Swarm-wide configuration: transport namespace, protocol timings, and the
/// worker role catalogue.
///
/// Every field has a default, so an empty TOML document (or a missing file)
/// yields a working configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SwarmConfig {
    /// Prefix under which every channel and key lives on the transport,
    /// isolating the swarm from unrelated uses of the same store.
    #[serde(default = "default_namespace")]
    pub namespace: String,
    /// How long a collector waits for a sub-task result.
    #[serde(default = "default_collect_timeout_secs")]
    pub collect_timeout_secs: u64,
    /// Interval between result-key probes inside `collect`.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    /// Interval between heartbeat refreshes in the worker harness.
    #[serde(default = "default_heartbeat_interval_secs")]
    pub heartbeat_interval_secs: u64,
    /// Age beyond which a heartbeat counts as dead; also the heartbeat
    /// key's TTL.
    #[serde(default = "default_liveness_window_secs")]
    pub liveness_window_secs: u64,
    /// TTL for pending-task ledger entries.
    #[serde(default = "default_pending_ttl_secs")]
    pub pending_ttl_secs: u64,
    /// TTL for stored result records.
    #[serde(default = "default_result_ttl_secs")]
    pub result_ttl_secs: u64,
    /// Worker roles known to the planner.
    #[serde(default = "default_worker_roles")]
    pub worker_roles: Vec<String>,
    /// Role used by the fallback plan and as the map-reduce default.
    #[serde(default = "default_worker")]
    pub default_worker: String,
    /// Grace period between the shutdown broadcast and broker disconnect.
    #[serde(default = "default_shutdown_grace_secs")]
    pub shutdown_grace_secs: u64,
}

fn default_namespace() -> String {
    "swarm".to_string()
}

fn default_collect_timeout_secs() -> u64 {
    30
}

fn default_poll_interval_ms() -> u64 {
    500
}

fn default_heartbeat_interval_secs() -> u64 {
    10
}

fn default_liveness_window_secs() -> u64 {
    30
}

fn default_pending_ttl_secs() -> u64 {
    300
}

fn default_result_ttl_secs() -> u64 {
    300
}

fn default_worker_roles() -> Vec<String> {
    ["analyst", "coder", "reviewer", "tester", "researcher"]
        .map(String::from)
        .to_vec()
}

fn default_worker() -> String {
    "analyst".to_string()
}

fn default_shutdown_grace_secs() -> u64 {
    2
}

impl Default for SwarmConfig {
    fn default() -> Self {
        Self {
            namespace: default_namespace(),
            collect_timeout_secs: default_collect_timeout_secs(),
            poll_interval_ms: default_poll_interval_ms(),
            heartbeat_interval_secs: default_heartbeat_interval_secs(),
            liveness_window_secs: default_liveness_window_secs(),
            pending_ttl_secs: default_pending_ttl_secs(),
            result_ttl_secs: default_result_ttl_secs(),
            worker_roles: default_worker_roles(),
            default_worker: default_worker(),
            shutdown_grace_secs: default_shutdown_grace_secs(),
        }
    }
}

impl SwarmConfig {
    /// Parses a TOML document. Missing fields take their defaults.
    pub fn from_toml_str(raw: &str) -> HivemindResult<Self> {
        toml::from_str(raw).map_err(|e| HivemindError::Config(e.to_string()))
    }

    /// Loads from a TOML file. A missing file yields the defaults.
    pub fn load(path: impl AsRef<Path>) -> HivemindResult<Self> {
        match std::fs::read_to_string(path) {
            Ok(raw) => Self::from_toml_str(&raw),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(e) => Err(e.into()),
        }
    }

    /// Collector wait bound.
    pub fn collect_timeout(&self) -> Duration {
        Duration::from_secs(self.collect_timeout_secs)
    }

    /// Interval between result-key probes.
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Interval between heartbeat refreshes.
    pub fn heartbeat_interval(&self) -> Duration {
        Duration::from_secs(self.heartbeat_interval_secs)
    }

    /// Liveness window as a duration.
    pub fn liveness_window(&self) -> Duration {
        Duration::from_secs(self.liveness_window_secs)
    }

    /// Pending-record TTL.
    pub fn pending_ttl(&self) -> Duration {
        Duration::from_secs(self.pending_ttl_secs)
    }

    /// Result-record TTL.
    pub fn result_ttl(&self) -> Duration {
        Duration::from_secs(self.result_ttl_secs)
    }

    /// Shutdown drain grace period.
    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_secs(self.shutdown_grace_secs)
    }
}
