//! Stall monitor: sweeps the task queue for `running` tasks whose
//! worker has stopped heartbeating past `stall_timeout_secs` and
//! revokes them, mirroring the teacher's agent-health sweep but driven
//! off task-claim timestamps rather than a dedicated heartbeat table.

use std::sync::Arc;

use tracing::warn;

use crate::application::AgentSupervisor;
use crate::domain::errors::DomainResult;
use crate::domain::ports::{Clock, TaskStore};

pub struct StallMonitor {
    task_store: Arc<dyn TaskStore>,
    supervisor: Arc<AgentSupervisor>,
    clock: Arc<dyn Clock>,
    stall_timeout_secs: i64,
}

impl StallMonitor {
    pub fn new(task_store: Arc<dyn TaskStore>, supervisor: Arc<AgentSupervisor>, clock: Arc<dyn Clock>, stall_timeout_secs: u64) -> Self {
        Self { task_store, supervisor, clock, stall_timeout_secs: stall_timeout_secs as i64 }
    }

    /// Revoke every stalled task back to `pending`, bump its attempt
    /// count, and report the stalled worker to the supervisor so it
    /// backs off (or is retired and replaced by the caller). Returns
    /// the number of tasks revoked.
    pub async fn sweep(&self) -> DomainResult<u64> {
        let stalled = self.task_store.list_stalled(self.stall_timeout_secs).await?;
        let now = self.clock.now();
        let mut revoked = 0u64;

        for mut task in stalled {
            let worker_id = task.worker_id;
            warn!(task_id = %task.id, worker_id = ?worker_id, "task stalled, revoking");

            task.attempt_count += 1;
            task.updated_at = now;
            self.task_store.update(&task).await?;
            self.task_store.release_task(task.id, "worker heartbeat stalled").await?;
            revoked += 1;

            if let Some(worker_id) = worker_id {
                self.supervisor.record_error(worker_id, "heartbeat stalled").await?;
            }
        }

        Ok(revoked)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::sqlite::{create_migrated_test_pool, SqliteAgentStore, SqliteTaskStore};
    use crate::domain::models::{AgentRole, TaskComplexity, TaskDraft};
    use crate::domain::ports::{AgentStore, SystemClock};
    use uuid::Uuid;

    #[tokio::test]
    async fn sweep_revokes_a_stalled_task_and_penalizes_its_worker() {
        let pool = create_migrated_test_pool().await.unwrap();
        let task_store = Arc::new(SqliteTaskStore::new(pool.clone()));
        let agent_store = Arc::new(SqliteAgentStore::new(pool));
        let supervisor = Arc::new(AgentSupervisor::new(agent_store.clone(), Arc::new(SystemClock), 3));

        let agent = supervisor.spawn(AgentRole::Worker).await.unwrap();

        let draft = TaskDraft {
            cycle_id: None,
            title: "Stalls forever".to_string(),
            description: "never finishes".to_string(),
            affected_files: vec![],
            acceptance_criteria: vec!["n/a".to_string()],
            priority: 1,
            complexity: TaskComplexity::Low,
            tags: vec![],
            deadline: None,
            creator_agent_id: Uuid::new_v4(),
            max_attempts: 3,
        };
        let created = task_store.create(draft).await.unwrap();
        let mut claimed = task_store.claim_task_atomic(created.id, agent.id).await.unwrap().unwrap();
        assert_eq!(claimed.attempt_count, 0);

        // Move the task into `running`, as a worker runtime would before
        // starting its model call - `list_stalled` only tracks `running`.
        claimed.status = crate::domain::models::TaskStatus::Running;
        task_store.update(&claimed).await.unwrap();

        // stall_timeout_secs = 0 means "claimed at all" already counts as stalled
        let monitor = StallMonitor::new(task_store.clone(), supervisor.clone(), Arc::new(SystemClock), 0);
        let revoked = monitor.sweep().await.unwrap();
        assert_eq!(revoked, 1);

        let reloaded = task_store.get(created.id).await.unwrap().unwrap();
        assert_eq!(reloaded.status, crate::domain::models::TaskStatus::Pending);
        assert_eq!(reloaded.attempt_count, 1);

        let penalized = agent_store.get(agent.id).await.unwrap().unwrap();
        assert_eq!(penalized.consecutive_errors, 1);
    }
}
