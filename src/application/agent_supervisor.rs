//! Agent supervisor: tracks the Planner/Worker/Judge roster, applies
//! backoff on repeated failures, and retires agents that exceed the
//! configured consecutive-error ceiling (L2).

use std::sync::Arc;

use tracing::{info, warn};
use uuid::Uuid;

use crate::domain::errors::DomainResult;
use crate::domain::models::{Agent, AgentRole, AgentStatus};
use crate::domain::ports::{AgentStore, Clock};

/// Exponential backoff windows applied on consecutive agent errors,
/// indexed by `consecutive_errors - 1` and capped at the last entry.
const BACKOFF_STEPS_SECS: &[i64] = &[5, 15, 60, 300];

pub struct AgentSupervisor {
    agent_store: Arc<dyn AgentStore>,
    clock: Arc<dyn Clock>,
    error_ceiling: u32,
}

impl AgentSupervisor {
    pub fn new(agent_store: Arc<dyn AgentStore>, clock: Arc<dyn Clock>, error_ceiling: u32) -> Self {
        Self { agent_store, clock, error_ceiling }
    }

    /// Register a fresh agent instance of the given role.
    pub async fn spawn(&self, role: AgentRole) -> DomainResult<Agent> {
        let agent = Agent::new(Uuid::new_v4(), role, self.clock.now());
        let created = self.agent_store.create(agent).await?;
        info!(agent_id = %created.id, role = %created.role.as_str(), "agent registered");
        Ok(created)
    }

    /// Record a successful task handled by `agent_id`.
    pub async fn record_success(&self, agent_id: Uuid) -> DomainResult<()> {
        let Some(mut agent) = self.agent_store.get(agent_id).await? else {
            return Ok(());
        };
        agent.record_success(self.clock.now());
        self.agent_store.update(&agent).await
    }

    /// Record a failure for `agent_id`. Returns `true` if the agent
    /// exceeded its error ceiling and was marked `dead` (the caller
    /// should replace it with a fresh [`AgentSupervisor::spawn`] call).
    pub async fn record_error(&self, agent_id: Uuid, reason: &str) -> DomainResult<bool> {
        let Some(mut agent) = self.agent_store.get(agent_id).await? else {
            return Ok(false);
        };

        let now = self.clock.now();
        let step = (agent.consecutive_errors as usize).min(BACKOFF_STEPS_SECS.len() - 1);
        let backoff_until = now + chrono::Duration::seconds(BACKOFF_STEPS_SECS[step]);
        agent.record_error(Some(backoff_until), now);

        let retired = agent.exceeded_error_ceiling(self.error_ceiling);
        if retired {
            agent.status = AgentStatus::Dead;
            warn!(agent_id = %agent.id, reason, "agent exceeded error ceiling, retiring");
        } else {
            warn!(agent_id = %agent.id, reason, consecutive_errors = agent.consecutive_errors, "agent error recorded, backing off");
        }

        self.agent_store.update(&agent).await?;
        Ok(retired)
    }

    /// Agents of a role that are neither backing off nor dead.
    pub async fn available(&self, role: AgentRole) -> DomainResult<Vec<Agent>> {
        let now = self.clock.now();
        let roster = self.agent_store.list_by_role(role).await?;
        Ok(roster
            .into_iter()
            .filter(|a| a.status != AgentStatus::Dead && !a.is_backing_off(now))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::sqlite::{create_migrated_test_pool, SqliteAgentStore};
    use crate::domain::ports::SystemClock;

    async fn supervisor(error_ceiling: u32) -> AgentSupervisor {
        let pool = create_migrated_test_pool().await.unwrap();
        AgentSupervisor::new(Arc::new(SqliteAgentStore::new(pool)), Arc::new(SystemClock), error_ceiling)
    }

    #[tokio::test]
    async fn spawned_agent_is_available() {
        let sup = supervisor(3).await;
        let agent = sup.spawn(AgentRole::Worker).await.unwrap();
        let available = sup.available(AgentRole::Worker).await.unwrap();
        assert_eq!(available.len(), 1);
        assert_eq!(available[0].id, agent.id);
    }

    #[tokio::test]
    async fn repeated_errors_retire_the_agent() {
        let sup = supervisor(2).await;
        let agent = sup.spawn(AgentRole::Worker).await.unwrap();

        let retired_first = sup.record_error(agent.id, "boom").await.unwrap();
        assert!(!retired_first);
        let retired_second = sup.record_error(agent.id, "boom again").await.unwrap();
        assert!(retired_second);

        let available = sup.available(AgentRole::Worker).await.unwrap();
        assert!(available.is_empty());
    }

    #[tokio::test]
    async fn success_resets_backoff() {
        let sup = supervisor(3).await;
        let agent = sup.spawn(AgentRole::Judge).await.unwrap();
        sup.record_error(agent.id, "transient").await.unwrap();
        sup.record_success(agent.id).await.unwrap();

        let available = sup.available(AgentRole::Judge).await.unwrap();
        assert_eq!(available.len(), 1);
        assert_eq!(available[0].consecutive_errors, 0);
    }
}
