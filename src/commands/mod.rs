//! CLI command definitions and dispatch.

pub mod admission;
pub mod redeem;
pub mod run_once;

use std::sync::Arc;

use clap::{Parser, Subcommand};

use turnstile_core::config::EngineConfig;
use turnstile_core::error::AppError;
use turnstile_core::traits::SystemClock;
use turnstile_engine::Engines;
use turnstile_store::MemoryDocumentStore;

/// Turnstile contention drills
#[derive(Debug, Parser)]
#[command(name = "turnstile-drill", version, about, long_about = None)]
pub struct Cli {
    /// Path to a configuration file. Falls back to `TURNSTILE_CONFIG`, then
    /// to `config/default` plus the `TURNSTILE_ENV` overlay.
    #[arg(short, long)]
    pub config: Option<String>,

    /// Drill to run
    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level commands
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Race actors for the slots of one resource
    Admission(admission::AdmissionArgs),
    /// Race callers through one idempotency key
    RunOnce(run_once::RunOnceArgs),
    /// Race claimants for one single-use token
    Redeem(redeem::RedeemArgs),
}

impl Cli {
    /// Load the engine configuration this invocation asked for.
    pub fn load_config(&self) -> Result<EngineConfig, AppError> {
        let explicit = self
            .config
            .clone()
            .or_else(|| std::env::var("TURNSTILE_CONFIG").ok());
        match explicit {
            Some(path) => EngineConfig::from_file(&path),
            None => {
                let env =
                    std::env::var("TURNSTILE_ENV").unwrap_or_else(|_| "development".to_string());
                EngineConfig::load(&env)
            }
        }
    }

    /// Execute the CLI command
    pub async fn execute(&self, config: EngineConfig) -> Result<(), AppError> {
        let drill = Drill::new(&config);
        tracing::info!(
            max_retries = config.transaction.max_retries,
            time_bucket_seconds = config.idempotency.time_bucket_seconds,
            "Starting drill"
        );
        match &self.command {
            Commands::Admission(args) => admission::execute(args, &drill).await,
            Commands::RunOnce(args) => run_once::execute(args, &drill).await,
            Commands::Redeem(args) => redeem::execute(args, &drill).await,
        }
    }
}

/// A fresh in-memory store and the engines wired to it.
#[derive(Debug, Clone)]
pub struct Drill {
    pub store: MemoryDocumentStore,
    pub engines: Engines,
}

impl Drill {
    fn new(config: &EngineConfig) -> Self {
        let store = MemoryDocumentStore::new();
        let engines = Engines::new(Arc::new(store.clone()), config, Arc::new(SystemClock));
        Self { store, engines }
    }
}

/// Await every spawned caller, surfacing a panicked task as an error.
pub async fn join_callers<T>(
    tasks: Vec<tokio::task::JoinHandle<Result<T, AppError>>>,
) -> Result<Vec<Result<T, AppError>>, AppError> {
    futures::future::join_all(tasks)
        .await
        .into_iter()
        .map(|joined| joined.map_err(|e| AppError::internal(format!("Caller task failed: {e}"))))
        .collect()
}
