//! CLI command definitions and handlers.

pub mod agent;
pub mod cycle;
pub mod run;
pub mod task;

use std::sync::Arc;

use clap::Subcommand;

use crate::domain::models::Config;
use crate::domain::ports::{AgentStore, Clock, CycleStore, FsExecAdapter, ModelAdapter, TaskStore, VcsAdapter, VerdictStore};

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Inspect and drive Plan -> Execute -> Judge cycles.
    Cycle(cycle::CycleArgs),
    /// Inspect the shared task queue.
    Task(task::TaskArgs),
    /// Inspect the supervised agent roster.
    Agent(agent::AgentArgs),
    /// Start the swarm and drive cycles until interrupted.
    Run(run::RunArgs),
}

/// Every port implementation the CLI might need, assembled once in
/// `main` from the loaded [`Config`].
pub struct CliContext {
    pub task_store: Arc<dyn TaskStore>,
    pub agent_store: Arc<dyn AgentStore>,
    pub cycle_store: Arc<dyn CycleStore>,
    pub verdict_store: Arc<dyn VerdictStore>,
    pub model: Arc<dyn ModelAdapter>,
    pub fs_exec: Arc<dyn FsExecAdapter>,
    pub vcs: Arc<dyn VcsAdapter>,
    pub clock: Arc<dyn Clock>,
    pub config: Config,
    pub json: bool,
}

pub async fn dispatch(command: Command, ctx: &CliContext) -> anyhow::Result<()> {
    match command {
        Command::Cycle(args) => cycle::run(args, ctx).await,
        Command::Task(args) => task::run(args, ctx).await,
        Command::Agent(args) => agent::run(args, ctx).await,
        Command::Run(args) => run::run(args, ctx).await,
    }
}
