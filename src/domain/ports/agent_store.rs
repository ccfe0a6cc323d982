//! Agent store port: persistence for the supervised Planner/Worker/Judge
//! roster.

use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::errors::DomainResult;
use crate::domain::models::{Agent, AgentRole};

/// Persistence interface for agent instances.
#[async_trait]
pub trait AgentStore: Send + Sync {
    async fn create(&self, agent: Agent) -> DomainResult<Agent>;

    async fn get(&self, id: Uuid) -> DomainResult<Option<Agent>>;

    /// Persist a mutated agent, enforcing optimistic-lock semantics.
    async fn update(&self, agent: &Agent) -> DomainResult<()>;

    async fn list_by_role(&self, role: AgentRole) -> DomainResult<Vec<Agent>>;

    async fn list_all(&self) -> DomainResult<Vec<Agent>>;
}
