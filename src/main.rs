//! Conclave CLI entry point.

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;

use conclave::adapters::clock::SystemClock;
use conclave::adapters::fs_exec::SandboxedFsExec;
use conclave::adapters::model::AnthropicAdapter;
use conclave::adapters::sqlite::{initialize_database, SqliteAgentStore, SqliteCycleStore, SqliteTaskStore, SqliteVerdictStore};
use conclave::adapters::vcs::GitCliAdapter;
use conclave::cli::commands::{self, CliContext};
use conclave::cli::Cli;
use conclave::infrastructure::config::ConfigLoader;
use conclave::infrastructure::logging::LoggerImpl;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => ConfigLoader::load_from_file(path).context("failed to load configuration file")?,
        None => ConfigLoader::load().context("failed to load configuration")?,
    };

    let _logger = LoggerImpl::init(&config.logging).context("failed to initialize logging")?;

    let database_url = format!("sqlite:{}", config.database.path.display());
    let pool = initialize_database(&database_url).await.context("failed to initialize database")?;

    let model: Arc<dyn conclave::domain::ports::ModelAdapter> =
        Arc::new(AnthropicAdapter::new(&config.model).context("failed to construct model adapter")?);

    let ctx = CliContext {
        task_store: Arc::new(SqliteTaskStore::new(pool.clone())),
        agent_store: Arc::new(SqliteAgentStore::new(pool.clone())),
        cycle_store: Arc::new(SqliteCycleStore::new(pool.clone())),
        verdict_store: Arc::new(SqliteVerdictStore::new(pool)),
        model,
        fs_exec: Arc::new(SandboxedFsExec::new(config.repository.root.clone())),
        vcs: Arc::new(GitCliAdapter::new(config.repository.root.clone(), config.repository.base_branch.clone())),
        clock: Arc::new(SystemClock),
        config,
        json: cli.json,
    };

    commands::dispatch(cli.command, &ctx).await
}
