//! Agent domain model: the Planner/Worker/Judge instances supervised by
//! the `AgentSupervisor`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The role an agent instance plays within a cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentRole {
    Planner,
    Worker,
    Judge,
}

impl AgentRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Planner => "planner",
            Self::Worker => "worker",
            Self::Judge => "judge",
        }
    }

    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "planner" => Some(Self::Planner),
            "worker" => Some(Self::Worker),
            "judge" => Some(Self::Judge),
            _ => None,
        }
    }
}

/// Supervision status of an agent instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentStatus {
    Idle,
    Busy,
    Backoff,
    Dead,
}

impl AgentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Busy => "busy",
            Self::Backoff => "backoff",
            Self::Dead => "dead",
        }
    }

    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "idle" => Some(Self::Idle),
            "busy" => Some(Self::Busy),
            "backoff" => Some(Self::Backoff),
            "dead" => Some(Self::Dead),
            _ => None,
        }
    }
}

/// A supervised agent instance: one Planner, Worker, or Judge slot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Agent {
    pub id: Uuid,
    pub role: AgentRole,
    pub status: AgentStatus,
    pub current_task_id: Option<Uuid>,
    pub consecutive_errors: u32,
    pub total_tasks_completed: u64,
    pub last_heartbeat: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub backoff_until: Option<DateTime<Utc>>,
    pub version: u64,
}

impl Agent {
    pub fn new(id: Uuid, role: AgentRole, now: DateTime<Utc>) -> Self {
        Self {
            id,
            role,
            status: AgentStatus::Idle,
            current_task_id: None,
            consecutive_errors: 0,
            total_tasks_completed: 0,
            last_heartbeat: now,
            created_at: now,
            backoff_until: None,
            version: 1,
        }
    }

    /// Whether the agent should be replaced outright per the supervisor's
    /// consecutive-error ceiling (L2).
    pub fn exceeded_error_ceiling(&self, ceiling: u32) -> bool {
        self.consecutive_errors >= ceiling
    }

    /// Whether a backoff window is currently active.
    pub fn is_backing_off(&self, now: DateTime<Utc>) -> bool {
        self.backoff_until.map(|until| now < until).unwrap_or(false)
    }

    pub fn record_success(&mut self, now: DateTime<Utc>) {
        self.consecutive_errors = 0;
        self.total_tasks_completed += 1;
        self.status = AgentStatus::Idle;
        self.current_task_id = None;
        self.backoff_until = None;
        self.last_heartbeat = now;
    }

    pub fn record_error(&mut self, backoff_until: Option<DateTime<Utc>>, now: DateTime<Utc>) {
        self.consecutive_errors += 1;
        self.status = if backoff_until.is_some() {
            AgentStatus::Backoff
        } else {
            AgentStatus::Idle
        };
        self.current_task_id = None;
        self.backoff_until = backoff_until;
        self.last_heartbeat = now;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_agent_starts_idle() {
        let agent = Agent::new(Uuid::new_v4(), AgentRole::Worker, Utc::now());
        assert_eq!(agent.status, AgentStatus::Idle);
        assert_eq!(agent.consecutive_errors, 0);
    }

    #[test]
    fn record_success_resets_error_streak() {
        let mut agent = Agent::new(Uuid::new_v4(), AgentRole::Worker, Utc::now());
        agent.record_error(None, Utc::now());
        agent.record_error(None, Utc::now());
        assert_eq!(agent.consecutive_errors, 2);
        agent.record_success(Utc::now());
        assert_eq!(agent.consecutive_errors, 0);
        assert_eq!(agent.total_tasks_completed, 1);
    }

    #[test]
    fn error_ceiling_detection() {
        let mut agent = Agent::new(Uuid::new_v4(), AgentRole::Worker, Utc::now());
        for _ in 0..3 {
            agent.record_error(None, Utc::now());
        }
        assert!(agent.exceeded_error_ceiling(3));
        assert!(!agent.exceeded_error_ceiling(4));
    }

    #[test]
    fn backoff_window_respected() {
        let now = Utc::now();
        let mut agent = Agent::new(Uuid::new_v4(), AgentRole::Worker, now);
        agent.record_error(Some(now + chrono::Duration::seconds(30)), now);
        assert!(agent.is_backing_off(now));
        assert!(!agent.is_backing_off(now + chrono::Duration::minutes(1)));
    }
}
