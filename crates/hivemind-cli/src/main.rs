//! Thin command-line surface over the swarm operations.
//!
//! Runs a single-process demo fleet over the in-memory transport: echo
//! workers for every configured role, a broker, and the orchestrator. A
//! distributed deployment swaps in a networked `Transport` and an
//! LLM-backed `ReasoningService` at the same seams.

use async_trait::async_trait;
use clap::{Parser, Subcommand};
use hivemind_broker::{Broker, MemoryTransport};
use hivemind_core::{HivemindError, HivemindResult, SwarmConfig};
use hivemind_orchestrator::{ExecutionStrategy, Orchestrator, ReasoningService};
use hivemind_worker::{EchoExecutor, Worker};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "hivemind", about = "Hivemind — distributed task-dispatch swarm")]
struct Cli {
    /// Path to config file
    #[arg(short, long, default_value = "hivemind.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Execute a task across a demo fleet and print the report
    Execute {
        /// Task description
        description: String,
        /// Execution strategy: auto, fan-out, pipeline, map-reduce
        #[arg(short, long, default_value = "auto")]
        strategy: String,
        /// JSON file with input data (map-reduce)
        #[arg(short, long)]
        data: Option<PathBuf>,
    },
    /// Print the fleet liveness report
    Health,
    /// Send a fleet-wide control broadcast
    Broadcast {
        /// Action: pause, resume, shutdown, status
        action: String,
        /// Optional note
        #[arg(short, long, default_value = "")]
        message: String,
    },
}

/// Placeholder reasoning backend: always unavailable, so planning uses the
/// deterministic fallback and synthesis uses the deterministic summary.
struct NullReasoning;

#[async_trait]
impl ReasoningService for NullReasoning {
    async fn complete(&self, _system_prompt: &str, _user_prompt: &str) -> HivemindResult<String> {
        Err(HivemindError::Orchestrator(
            "no reasoning backend configured".into(),
        ))
    }
}

#[tokio::main]
async fn main() -> HivemindResult<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let cli = Cli::parse();
    let config = SwarmConfig::load(&cli.config)?;
    let transport = Arc::new(MemoryTransport::new());

    match cli.command {
        Commands::Execute {
            description,
            strategy,
            data,
        } => {
            let strategy: ExecutionStrategy =
                strategy.parse().map_err(HivemindError::Config)?;
            let data = match data {
                Some(path) => Some(serde_json::from_str(&std::fs::read_to_string(path)?)?),
                None => None,
            };

            // Demo fleet: one echo worker per configured role.
            let mut handles = Vec::new();
            for role in &config.worker_roles {
                let broker = Arc::new(Broker::new(transport.clone(), role, config.clone()));
                let worker = Arc::new(Worker::new(broker, Arc::new(EchoExecutor)));
                handles.push(tokio::spawn(async move { worker.run().await }));
            }
            tokio::time::sleep(std::time::Duration::from_millis(100)).await;

            let broker = Arc::new(Broker::new(
                transport.clone(),
                "orchestrator",
                config.clone(),
            ));
            let orchestrator = Orchestrator::new(broker, Arc::new(NullReasoning));

            let report = orchestrator.execute(&description, strategy, data).await?;
            println!("{}", serde_json::to_string_pretty(&report)?);

            orchestrator.shutdown().await?;
            for handle in handles {
                if let Ok(result) = handle.await {
                    result?;
                }
            }
        }
        Commands::Health => {
            let broker = Broker::new(transport, "orchestrator", config);
            let report = broker.health_check().await?;
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        Commands::Broadcast { action, message } => {
            let broker = Broker::new(transport, "orchestrator", config);
            let id = broker.broadcast(&action, &message).await?;
            info!(id = %id, "broadcast sent");
        }
    }

    Ok(())
}
