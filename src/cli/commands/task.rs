//! Task CLI commands.

use clap::{Args, Subcommand};
use serde::Serialize;
use uuid::Uuid;

use crate::cli::commands::CliContext;
use crate::cli::output::{print_output, truncate, CommandOutput, TableFormatter};
use crate::domain::models::{Task, TaskStatus};
use crate::domain::ports::TaskFilter;

#[derive(Args, Debug)]
pub struct TaskArgs {
    #[command(subcommand)]
    pub command: TaskCommands,
}

#[derive(Subcommand, Debug)]
pub enum TaskCommands {
    /// List tasks, optionally filtered by status.
    List {
        #[arg(short, long)]
        status: Option<String>,
        #[arg(long)]
        cycle: Option<Uuid>,
    },
    /// Show one task's full detail, including its diagnostic history.
    Show { id: Uuid },
    /// Summarize task counts by status.
    Status {
        #[arg(long)]
        cycle: Option<Uuid>,
    },
}

#[derive(Debug, Serialize)]
struct TaskSummary {
    id: Uuid,
    title: String,
    status: String,
    priority: u8,
    attempt_count: u32,
    max_attempts: u32,
    branch_name: Option<String>,
}

impl From<&Task> for TaskSummary {
    fn from(task: &Task) -> Self {
        Self {
            id: task.id,
            title: task.title.clone(),
            status: task.status.as_str().to_string(),
            priority: task.priority,
            attempt_count: task.attempt_count,
            max_attempts: task.max_attempts,
            branch_name: task.branch_name.clone(),
        }
    }
}

struct TaskListOutput {
    tasks: Vec<Task>,
}

impl Serialize for TaskListOutput {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.tasks.iter().map(TaskSummary::from).collect::<Vec<_>>().serialize(serializer)
    }
}

impl CommandOutput for TaskListOutput {
    fn to_human(&self) -> String {
        if self.tasks.is_empty() {
            return "No tasks found.".to_string();
        }
        TableFormatter::new().format_tasks(&self.tasks)
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self.tasks.iter().map(TaskSummary::from).collect::<Vec<_>>()).unwrap_or_default()
    }
}

struct TaskShowOutput {
    task: Task,
}

impl Serialize for TaskShowOutput {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.task.serialize(serializer)
    }
}

impl CommandOutput for TaskShowOutput {
    fn to_human(&self) -> String {
        let task = &self.task;
        let mut lines = vec![
            format!("ID:          {}", task.id),
            format!("Title:       {}", task.title),
            format!("Status:      {}", task.status.as_str()),
            format!("Priority:    {}", task.priority),
            format!("Attempts:    {}/{}", task.attempt_count, task.max_attempts),
            format!("Description: {}", truncate(&task.description, 120)),
        ];
        if let Some(branch) = &task.branch_name {
            lines.push(format!("Branch:      {branch}"));
        }
        if !task.diagnostics.is_empty() {
            lines.push("Diagnostics:".to_string());
            for d in &task.diagnostics {
                lines.push(format!("  attempt {}: {}", d.attempt, d.reason));
            }
        }
        lines.join("\n")
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(&self.task).unwrap_or_default()
    }
}

#[derive(Debug, Serialize)]
struct StatusSummaryOutput {
    counts: std::collections::BTreeMap<String, u64>,
}

impl CommandOutput for StatusSummaryOutput {
    fn to_human(&self) -> String {
        if self.counts.is_empty() {
            return "No tasks found.".to_string();
        }
        self.counts.iter().map(|(status, count)| format!("{status:<15} {count}")).collect::<Vec<_>>().join("\n")
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(&self.counts).unwrap_or_default()
    }
}

pub async fn run(args: TaskArgs, ctx: &CliContext) -> anyhow::Result<()> {
    match args.command {
        TaskCommands::List { status, cycle } => {
            let filter = TaskFilter { status: status.and_then(|s| TaskStatus::from_str(&s)), cycle_id: cycle, worker_id: None };
            let tasks = ctx.task_store.list(filter).await?;
            print_output(&TaskListOutput { tasks }, ctx.json);
        }
        TaskCommands::Show { id } => {
            let task = ctx.task_store.get(id).await?.ok_or_else(|| anyhow::anyhow!("task {id} not found"))?;
            print_output(&TaskShowOutput { task }, ctx.json);
        }
        TaskCommands::Status { cycle } => {
            let counts = ctx.task_store.count_by_status(cycle).await?;
            let counts = counts.into_iter().map(|(status, n)| (status.as_str().to_string(), n)).collect();
            print_output(&StatusSummaryOutput { counts }, ctx.json);
        }
    }
    Ok(())
}
