use thiserror::Error;

/// Top-level error type for the Hivemind framework.
///
/// Each variant corresponds to a subsystem that can produce errors.
/// Transport failures are fatal to the caller; decode failures inside the
/// dispatch loop are logged and dropped rather than propagated.
#[derive(Debug, Error)]
pub enum HivemindError {
    /// The transport (KV store / pub/sub channel) is unreachable or failed
    /// mid-operation. Never retried internally; retry policy belongs to the
    /// caller.
    #[error("Transport error: {0}")]
    Transport(String),

    /// A message on the wire could not be decoded into a [`crate::Message`].
    #[error("Decode error: {0}")]
    Decode(String),

    /// An error raised by the broker's bookkeeping (registry, pending
    /// ledger, shared state).
    #[error("Broker error: {0}")]
    Broker(String),

    /// An error from the multi-agent orchestrator.
    #[error("Orchestrator error: {0}")]
    Orchestrator(String),

    /// An error from the worker harness.
    #[error("Worker error: {0}")]
    Worker(String),

    /// An error in configuration parsing or validation.
    #[error("Config error: {0}")]
    Config(String),

    /// A JSON serialization or deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A standard I/O error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// A convenience `Result` alias using [`HivemindError`].
pub type HivemindResult<T> = Result<T, HivemindError>;
