use serde::{Deserialize, Serialize};

/// Liveness classification for one worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LivenessStatus {
    /// Heartbeat seen within the liveness window.
    Alive,
    /// Heartbeat older than the liveness window.
    Dead,
    /// Heartbeat key present but its value was unreadable.
    Unknown,
}

/// One worker's entry in a health report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerHealth {
    /// Worker name, as taken from its heartbeat key.
    pub name: String,
    /// Classification against the liveness window.
    pub status: LivenessStatus,
    /// Seconds since the last heartbeat; `-1` when unknown.
    pub last_seen_seconds_ago: i64,
}

/// Fleet-wide liveness snapshot.
///
/// Workers with no heartbeat key at all do not appear here; `Unknown` is
/// reserved for keys whose value could not be read.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthReport {
    /// Per-worker entries.
    pub workers: Vec<WorkerHealth>,
    /// Number of entries.
    pub total: usize,
    /// Entries classified alive.
    pub healthy: usize,
    /// Entries classified dead or unknown.
    pub unhealthy: usize,
}

impl HealthReport {
    /// Builds a report from per-worker entries, computing the counts.
    pub fn from_workers(workers: Vec<WorkerHealth>) -> Self {
        let healthy = workers
            .iter()
            .filter(|w| w.status == LivenessStatus::Alive)
            .count();
        Self {
            total: workers.len(),
            unhealthy: workers.len() - healthy,
            healthy,
            workers,
        }
    }

    /// Names of alive workers.
    pub fn alive_workers(&self) -> Vec<&str> {
        self.workers
            .iter()
            .filter(|w| w.status == LivenessStatus::Alive)
            .map(|w| w.name.as_str())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counts() {
        let report = HealthReport::from_workers(vec![
            WorkerHealth {
                name: "a".into(),
                status: LivenessStatus::Alive,
                last_seen_seconds_ago: 2,
            },
            WorkerHealth {
                name: "b".into(),
                status: LivenessStatus::Dead,
                last_seen_seconds_ago: 90,
            },
            WorkerHealth {
                name: "c".into(),
                status: LivenessStatus::Unknown,
                last_seen_seconds_ago: -1,
            },
        ]);
        assert_eq!(report.total, 3);
        assert_eq!(report.healthy, 1);
        assert_eq!(report.unhealthy, 2);
        assert_eq!(report.alive_workers(), vec!["a"]);
    }
}
