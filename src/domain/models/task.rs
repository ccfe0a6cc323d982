//! Task domain model.
//!
//! A task is a discrete unit of work submitted by a Planner and claimed
//! and executed by exactly one Worker; the Judge reviews the cycle's
//! tasks in aggregate, not individually.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Lifecycle status of a task. See I1-I6 for transition invariants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Pending,
    Assigned,
    Running,
    Completed,
    Failed,
    Abandoned,
}

impl TaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Assigned => "assigned",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Abandoned => "abandoned",
        }
    }

    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(Self::Pending),
            "assigned" => Some(Self::Assigned),
            "running" => Some(Self::Running),
            "completed" => Some(Self::Completed),
            "failed" => Some(Self::Failed),
            "abandoned" => Some(Self::Abandoned),
            _ => None,
        }
    }

    /// Terminal statuses accept no further transition (I6, P3).
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Abandoned)
    }

    /// Whether the task still belongs to the active queue (pending/assigned/running).
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Pending | Self::Assigned | Self::Running)
    }

    pub fn can_transition_to(&self, next: Self) -> bool {
        if self.is_terminal() {
            return false;
        }
        match self {
            Self::Pending => matches!(next, Self::Assigned),
            Self::Assigned => matches!(next, Self::Running | Self::Pending | Self::Failed | Self::Abandoned),
            Self::Running => matches!(
                next,
                Self::Completed | Self::Failed | Self::Pending | Self::Abandoned
            ),
            Self::Failed => matches!(next, Self::Pending | Self::Abandoned),
            Self::Completed | Self::Abandoned => false,
        }
    }
}

/// Complexity tag; drives the per-task execution timeout (§4.3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskComplexity {
    Low,
    Medium,
    High,
}

impl TaskComplexity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }

    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "low" => Some(Self::Low),
            "medium" => Some(Self::Medium),
            "high" => Some(Self::High),
            _ => None,
        }
    }

    /// Canonical default timeout for this complexity tier (overridable via config).
    pub fn default_timeout(&self) -> chrono::Duration {
        match self {
            Self::Low => chrono::Duration::minutes(30),
            Self::Medium => chrono::Duration::hours(2),
            Self::High => chrono::Duration::hours(8),
        }
    }
}

/// One recorded attempt diagnostic, appended on every failure/revocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttemptDiagnostic {
    pub attempt: u32,
    pub worker_id: Option<Uuid>,
    pub reason: String,
    pub recorded_at: DateTime<Utc>,
}

/// A unit of work in the shared task queue.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub id: Uuid,
    /// The cycle this task was created under (drives quiescence detection).
    pub cycle_id: Option<Uuid>,
    pub title: String,
    pub description: String,
    pub affected_files: Vec<String>,
    pub acceptance_criteria: Vec<String>,
    pub priority: u8,
    pub complexity: TaskComplexity,
    pub tags: Vec<String>,
    pub deadline: Option<DateTime<Utc>>,

    pub status: TaskStatus,
    pub worker_id: Option<Uuid>,
    pub creator_agent_id: Uuid,
    pub claimed_at: Option<DateTime<Utc>>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub version: u64,
    pub attempt_count: u32,
    pub max_attempts: u32,
    pub diagnostics: Vec<AttemptDiagnostic>,

    pub branch_name: Option<String>,
    pub commit_id: Option<String>,
    pub verdict_cycle_id: Option<Uuid>,
}

/// Fields a Planner supplies; the store assigns identity and lifecycle defaults.
#[derive(Debug, Clone)]
pub struct TaskDraft {
    pub cycle_id: Option<Uuid>,
    pub title: String,
    pub description: String,
    pub affected_files: Vec<String>,
    pub acceptance_criteria: Vec<String>,
    pub priority: u8,
    pub complexity: TaskComplexity,
    pub tags: Vec<String>,
    pub deadline: Option<DateTime<Utc>>,
    pub creator_agent_id: Uuid,
    pub max_attempts: u32,
}

impl Task {
    /// Assemble a new task from a validated draft. Status starts `pending`.
    pub fn from_draft(id: Uuid, draft: TaskDraft, now: DateTime<Utc>) -> Self {
        Self {
            id,
            cycle_id: draft.cycle_id,
            title: draft.title,
            description: draft.description,
            affected_files: draft.affected_files,
            acceptance_criteria: draft.acceptance_criteria,
            priority: draft.priority,
            complexity: draft.complexity,
            tags: draft.tags,
            deadline: draft.deadline,
            status: TaskStatus::Pending,
            worker_id: None,
            creator_agent_id: draft.creator_agent_id,
            claimed_at: None,
            created_at: now,
            updated_at: now,
            version: 1,
            attempt_count: 0,
            max_attempts: draft.max_attempts,
            diagnostics: Vec::new(),
            branch_name: None,
            commit_id: None,
            verdict_cycle_id: None,
        }
    }

    /// Whether the deadline (if any) has passed relative to `now`.
    pub fn is_past_deadline(&self, now: DateTime<Utc>) -> bool {
        self.deadline.map(|d| d <= now).unwrap_or(false)
    }
}
