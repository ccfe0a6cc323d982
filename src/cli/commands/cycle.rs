//! Cycle CLI commands.

use clap::{Args, Subcommand};
use serde::Serialize;

use crate::cli::commands::CliContext;
use crate::cli::output::{print_output, CommandOutput};
use crate::domain::models::Cycle;

#[derive(Args, Debug)]
pub struct CycleArgs {
    #[command(subcommand)]
    pub command: CycleCommands,
}

#[derive(Subcommand, Debug)]
pub enum CycleCommands {
    /// Show the current or most recent cycle.
    Status,
    /// List recent cycles.
    List {
        #[arg(short, long, default_value = "10")]
        limit: u32,
    },
    /// Request a pause: the current cycle finishes, but no new one
    /// opens until `cycle open` is run.
    Pause,
    /// Clear a pending pause, allowing the next cycle to open.
    Open,
}

struct CycleStatusOutput {
    cycle: Option<Cycle>,
    paused: bool,
}

impl Serialize for CycleStatusOutput {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}

impl CommandOutput for CycleStatusOutput {
    fn to_human(&self) -> String {
        match &self.cycle {
            None => "No cycles have run yet.".to_string(),
            Some(cycle) => format!(
                "Cycle #{}\nPhase:    {}\nStarted:  {}\nCompleted: {}\nAbandoned: {}\nCarried:   {}\nParked:    {}",
                cycle.sequence,
                cycle.phase.as_str(),
                cycle.started_at,
                cycle.tasks_completed,
                cycle.tasks_abandoned,
                cycle.tasks_carried_over,
                self.paused,
            ),
        }
    }

    fn to_json(&self) -> serde_json::Value {
        let mut value = serde_json::to_value(&self.cycle).unwrap_or_default();
        if let Some(obj) = value.as_object_mut() {
            obj.insert("paused".to_string(), serde_json::Value::Bool(self.paused));
        }
        value
    }
}

struct CycleListOutput {
    cycles: Vec<Cycle>,
}

impl Serialize for CycleListOutput {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.cycles.serialize(serializer)
    }
}

impl CommandOutput for CycleListOutput {
    fn to_human(&self) -> String {
        if self.cycles.is_empty() {
            return "No cycles have run yet.".to_string();
        }
        self.cycles
            .iter()
            .map(|c| format!("#{:<5} {:<12} completed={} abandoned={}", c.sequence, c.phase.as_str(), c.tasks_completed, c.tasks_abandoned))
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(&self.cycles).unwrap_or_default()
    }
}

pub async fn run(args: CycleArgs, ctx: &CliContext) -> anyhow::Result<()> {
    match args.command {
        CycleCommands::Status => {
            let cycle = ctx.cycle_store.latest().await?;
            let paused = ctx.cycle_store.is_paused().await?;
            print_output(&CycleStatusOutput { cycle, paused }, ctx.json);
        }
        CycleCommands::List { limit } => {
            let cycles = ctx.cycle_store.list_recent(limit).await?;
            print_output(&CycleListOutput { cycles }, ctx.json);
        }
        CycleCommands::Pause => {
            ctx.cycle_store.set_paused(true).await?;
            println!("Pause requested. The running cycle will finish, and no new one will open until `cycle open` is run.");
        }
        CycleCommands::Open => {
            ctx.cycle_store.set_paused(false).await?;
            println!("Pause cleared. A new cycle will open on the next controller pass.");
        }
    }
    Ok(())
}
