//! SQLite implementation of the `AgentStore` port.

use async_trait::async_trait;
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{Agent, AgentRole, AgentStatus};
use crate::domain::ports::AgentStore;

#[derive(Clone)]
pub struct SqliteAgentStore {
    pool: SqlitePool,
}

impl SqliteAgentStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AgentStore for SqliteAgentStore {
    async fn create(&self, agent: Agent) -> DomainResult<Agent> {
        sqlx::query(
            r#"INSERT INTO agents (id, role, status, current_task_id, consecutive_errors,
               total_tasks_completed, last_heartbeat, created_at, backoff_until, version)
               VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"#,
        )
        .bind(agent.id.to_string())
        .bind(agent.role.as_str())
        .bind(agent.status.as_str())
        .bind(agent.current_task_id.map(|id| id.to_string()))
        .bind(i64::from(agent.consecutive_errors))
        .bind(agent.total_tasks_completed as i64)
        .bind(agent.last_heartbeat.to_rfc3339())
        .bind(agent.created_at.to_rfc3339())
        .bind(agent.backoff_until.map(|d| d.to_rfc3339()))
        .bind(agent.version as i64)
        .execute(&self.pool)
        .await?;

        Ok(agent)
    }

    async fn get(&self, id: Uuid) -> DomainResult<Option<Agent>> {
        let row: Option<AgentRow> = sqlx::query_as("SELECT * FROM agents WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await?;

        row.map(TryInto::try_into).transpose()
    }

    async fn update(&self, agent: &Agent) -> DomainResult<()> {
        let next_version = agent.version + 1;
        let result = sqlx::query(
            r#"UPDATE agents SET status = ?, current_task_id = ?, consecutive_errors = ?,
               total_tasks_completed = ?, last_heartbeat = ?, backoff_until = ?, version = ?
               WHERE id = ? AND version = ?"#,
        )
        .bind(agent.status.as_str())
        .bind(agent.current_task_id.map(|id| id.to_string()))
        .bind(i64::from(agent.consecutive_errors))
        .bind(agent.total_tasks_completed as i64)
        .bind(agent.last_heartbeat.to_rfc3339())
        .bind(agent.backoff_until.map(|d| d.to_rfc3339()))
        .bind(next_version as i64)
        .bind(agent.id.to_string())
        .bind(agent.version as i64)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return match self.get(agent.id).await? {
                Some(current) => Err(DomainError::StaleVersion {
                    entity: "agent".to_string(),
                    id: agent.id.to_string(),
                    expected: agent.version,
                    found: current.version,
                }),
                None => Err(DomainError::AgentNotFound(agent.id)),
            };
        }

        Ok(())
    }

    async fn list_by_role(&self, role: AgentRole) -> DomainResult<Vec<Agent>> {
        let rows: Vec<AgentRow> = sqlx::query_as("SELECT * FROM agents WHERE role = ? ORDER BY created_at")
            .bind(role.as_str())
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter().map(TryInto::try_into).collect()
    }

    async fn list_all(&self) -> DomainResult<Vec<Agent>> {
        let rows: Vec<AgentRow> = sqlx::query_as("SELECT * FROM agents ORDER BY created_at").fetch_all(&self.pool).await?;
        rows.into_iter().map(TryInto::try_into).collect()
    }
}

#[derive(sqlx::FromRow)]
struct AgentRow {
    id: String,
    role: String,
    status: String,
    current_task_id: Option<String>,
    consecutive_errors: i64,
    total_tasks_completed: i64,
    last_heartbeat: String,
    created_at: String,
    backoff_until: Option<String>,
    version: i64,
}

impl TryFrom<AgentRow> for Agent {
    type Error = DomainError;

    fn try_from(row: AgentRow) -> Result<Self, Self::Error> {
        let role = AgentRole::from_str(&row.role)
            .ok_or_else(|| DomainError::Serialization(format!("invalid agent role: {}", row.role)))?;
        let status = AgentStatus::from_str(&row.status)
            .ok_or_else(|| DomainError::Serialization(format!("invalid agent status: {}", row.status)))?;

        Ok(Agent {
            id: super::parse_uuid(&row.id)?,
            role,
            status,
            current_task_id: super::parse_optional_uuid(row.current_task_id)?,
            consecutive_errors: row.consecutive_errors as u32,
            total_tasks_completed: row.total_tasks_completed as u64,
            last_heartbeat: super::parse_datetime(&row.last_heartbeat)?,
            created_at: super::parse_datetime(&row.created_at)?,
            backoff_until: super::parse_optional_datetime(row.backoff_until)?,
            version: row.version as u64,
        })
    }
}
