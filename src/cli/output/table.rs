//! Table rendering for tasks, agents, and cycles using comfy-table.

use comfy_table::{Attribute, Cell, Color, ContentArrangement, Table};

use crate::domain::models::{Agent, AgentStatus, Task, TaskStatus};

pub struct TableFormatter {
    use_colors: bool,
}

impl Default for TableFormatter {
    fn default() -> Self {
        Self::new()
    }
}

impl TableFormatter {
    pub fn new() -> Self {
        Self { use_colors: supports_color() }
    }

    pub fn with_colors(use_colors: bool) -> Self {
        Self { use_colors }
    }

    fn base_table(&self) -> Table {
        let mut table = Table::new();
        table.set_content_arrangement(ContentArrangement::Dynamic);
        table
    }

    pub fn format_tasks(&self, tasks: &[Task]) -> String {
        let mut table = self.base_table();
        table.set_header(vec![
            Cell::new("ID").add_attribute(Attribute::Bold),
            Cell::new("Title").add_attribute(Attribute::Bold),
            Cell::new("Status").add_attribute(Attribute::Bold),
            Cell::new("Priority").add_attribute(Attribute::Bold),
            Cell::new("Attempts").add_attribute(Attribute::Bold),
            Cell::new("Branch").add_attribute(Attribute::Bold),
        ]);

        for task in tasks {
            let id_short = &task.id.to_string()[..8];
            let title = super::truncate(&task.title, 40);
            let status_cell = if self.use_colors {
                Cell::new(task.status.as_str()).fg(status_color(task.status))
            } else {
                Cell::new(task.status.as_str())
            };

            table.add_row(vec![
                Cell::new(id_short),
                Cell::new(title),
                status_cell,
                Cell::new(task.priority),
                Cell::new(format!("{}/{}", task.attempt_count, task.max_attempts)),
                Cell::new(task.branch_name.as_deref().unwrap_or("-")),
            ]);
        }

        table.to_string()
    }

    pub fn format_agents(&self, agents: &[Agent]) -> String {
        let mut table = self.base_table();
        table.set_header(vec![
            Cell::new("ID").add_attribute(Attribute::Bold),
            Cell::new("Role").add_attribute(Attribute::Bold),
            Cell::new("Status").add_attribute(Attribute::Bold),
            Cell::new("Errors").add_attribute(Attribute::Bold),
            Cell::new("Completed").add_attribute(Attribute::Bold),
        ]);

        for agent in agents {
            let id_short = &agent.id.to_string()[..8];
            let status_cell = if self.use_colors {
                Cell::new(agent.status.as_str()).fg(agent_status_color(agent.status))
            } else {
                Cell::new(agent.status.as_str())
            };

            table.add_row(vec![
                Cell::new(id_short),
                Cell::new(agent.role.as_str()),
                status_cell,
                Cell::new(agent.consecutive_errors),
                Cell::new(agent.total_tasks_completed),
            ]);
        }

        table.to_string()
    }
}

fn status_color(status: TaskStatus) -> Color {
    match status {
        TaskStatus::Pending => Color::Grey,
        TaskStatus::Assigned | TaskStatus::Running => Color::Yellow,
        TaskStatus::Completed => Color::Green,
        TaskStatus::Failed => Color::DarkYellow,
        TaskStatus::Abandoned => Color::Red,
    }
}

fn agent_status_color(status: AgentStatus) -> Color {
    match status {
        AgentStatus::Idle => Color::Grey,
        AgentStatus::Busy => Color::Yellow,
        AgentStatus::Backoff => Color::DarkYellow,
        AgentStatus::Dead => Color::Red,
    }
}

fn supports_color() -> bool {
    std::env::var("NO_COLOR").is_err()
}
