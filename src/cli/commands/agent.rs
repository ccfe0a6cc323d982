//! Agent CLI commands.

use clap::{Args, Subcommand};
use serde::Serialize;
use uuid::Uuid;

use crate::cli::commands::CliContext;
use crate::cli::output::{print_output, CommandOutput, TableFormatter};
use crate::domain::models::{Agent, AgentRole};

#[derive(Args, Debug)]
pub struct AgentArgs {
    #[command(subcommand)]
    pub command: AgentCommands,
}

#[derive(Subcommand, Debug)]
pub enum AgentCommands {
    /// List agents, optionally filtered by role.
    List {
        #[arg(short, long)]
        role: Option<String>,
    },
    /// Show one agent's full detail.
    Show { id: Uuid },
}

struct AgentListOutput {
    agents: Vec<Agent>,
}

impl Serialize for AgentListOutput {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.agents.serialize(serializer)
    }
}

impl CommandOutput for AgentListOutput {
    fn to_human(&self) -> String {
        if self.agents.is_empty() {
            return "No agents found.".to_string();
        }
        TableFormatter::new().format_agents(&self.agents)
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(&self.agents).unwrap_or_default()
    }
}

struct AgentShowOutput {
    agent: Agent,
}

impl Serialize for AgentShowOutput {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.agent.serialize(serializer)
    }
}

impl CommandOutput for AgentShowOutput {
    fn to_human(&self) -> String {
        let agent = &self.agent;
        format!(
            "ID:        {}\nRole:      {}\nStatus:    {}\nErrors:    {}\nCompleted: {}",
            agent.id,
            agent.role.as_str(),
            agent.status.as_str(),
            agent.consecutive_errors,
            agent.total_tasks_completed
        )
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(&self.agent).unwrap_or_default()
    }
}

pub async fn run(args: AgentArgs, ctx: &CliContext) -> anyhow::Result<()> {
    match args.command {
        AgentCommands::List { role } => {
            let agents = match role.and_then(|r| AgentRole::from_str(&r)) {
                Some(role) => ctx.agent_store.list_by_role(role).await?,
                None => ctx.agent_store.list_all().await?,
            };
            print_output(&AgentListOutput { agents }, ctx.json);
        }
        AgentCommands::Show { id } => {
            let agent = ctx.agent_store.get(id).await?.ok_or_else(|| anyhow::anyhow!("agent {id} not found"))?;
            print_output(&AgentShowOutput { agent }, ctx.json);
        }
    }
    Ok(())
}
