//! CLI interface: command definitions and output formatting.

pub mod commands;
pub mod output;

use clap::Parser;
use std::path::PathBuf;

use commands::Command;

#[derive(Parser, Debug)]
#[command(name = "conclave", version, about = "Orchestrator and task lifecycle engine for autonomous development swarms")]
pub struct Cli {
    /// Path to a config file, bypassing project-local discovery.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Emit machine-readable JSON instead of human-formatted tables.
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Command,
}
