//! SQLite implementation of the `TaskStore` port.

use async_trait::async_trait;
use sqlx::SqlitePool;
use std::collections::HashMap;
use uuid::Uuid;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{AttemptDiagnostic, Task, TaskComplexity, TaskDraft, TaskStatus};
use crate::domain::ports::{TaskFilter, TaskStore};

#[derive(Clone)]
pub struct SqliteTaskStore {
    pool: SqlitePool,
}

impl SqliteTaskStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TaskStore for SqliteTaskStore {
    async fn create(&self, draft: TaskDraft) -> DomainResult<Task> {
        let now = chrono::Utc::now();
        let task = Task::from_draft(Uuid::new_v4(), draft, now);
        insert_task(&self.pool, &task).await?;
        Ok(task)
    }

    async fn get(&self, id: Uuid) -> DomainResult<Option<Task>> {
        let row: Option<TaskRow> = sqlx::query_as("SELECT * FROM tasks WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await?;

        row.map(TryInto::try_into).transpose()
    }

    async fn update(&self, task: &Task) -> DomainResult<()> {
        let affected_files_json = serde_json::to_string(&task.affected_files)?;
        let acceptance_criteria_json = serde_json::to_string(&task.acceptance_criteria)?;
        let tags_json = serde_json::to_string(&task.tags)?;
        let diagnostics_json = serde_json::to_string(&task.diagnostics)?;
        let next_version = task.version + 1;

        let result = sqlx::query(
            r#"UPDATE tasks SET cycle_id = ?, title = ?, description = ?, affected_files = ?,
               acceptance_criteria = ?, priority = ?, complexity = ?, tags = ?, deadline = ?,
               status = ?, worker_id = ?, claimed_at = ?, updated_at = ?, version = ?,
               attempt_count = ?, max_attempts = ?, diagnostics = ?, branch_name = ?,
               commit_id = ?, verdict_cycle_id = ?
               WHERE id = ? AND version = ?"#,
        )
        .bind(task.cycle_id.map(|id| id.to_string()))
        .bind(&task.title)
        .bind(&task.description)
        .bind(&affected_files_json)
        .bind(&acceptance_criteria_json)
        .bind(i64::from(task.priority))
        .bind(task.complexity.as_str())
        .bind(&tags_json)
        .bind(task.deadline.map(|d| d.to_rfc3339()))
        .bind(task.status.as_str())
        .bind(task.worker_id.map(|id| id.to_string()))
        .bind(task.claimed_at.map(|d| d.to_rfc3339()))
        .bind(task.updated_at.to_rfc3339())
        .bind(next_version as i64)
        .bind(i64::from(task.attempt_count))
        .bind(i64::from(task.max_attempts))
        .bind(&diagnostics_json)
        .bind(&task.branch_name)
        .bind(&task.commit_id)
        .bind(task.verdict_cycle_id.map(|id| id.to_string()))
        .bind(task.id.to_string())
        .bind(task.version as i64)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return match self.get(task.id).await? {
                Some(current) => Err(DomainError::StaleVersion {
                    entity: "task".to_string(),
                    id: task.id.to_string(),
                    expected: task.version,
                    found: current.version,
                }),
                None => Err(DomainError::TaskNotFound(task.id)),
            };
        }

        Ok(())
    }

    async fn list(&self, filter: TaskFilter) -> DomainResult<Vec<Task>> {
        let mut query = String::from("SELECT * FROM tasks WHERE 1=1");
        let mut bindings: Vec<String> = Vec::new();

        if let Some(status) = &filter.status {
            query.push_str(" AND status = ?");
            bindings.push(status.as_str().to_string());
        }
        if let Some(cycle_id) = &filter.cycle_id {
            query.push_str(" AND cycle_id = ?");
            bindings.push(cycle_id.to_string());
        }
        if let Some(worker_id) = &filter.worker_id {
            query.push_str(" AND worker_id = ?");
            bindings.push(worker_id.to_string());
        }

        query.push_str(" ORDER BY created_at DESC");

        let mut q = sqlx::query_as::<_, TaskRow>(&query);
        for binding in &bindings {
            q = q.bind(binding);
        }

        let rows: Vec<TaskRow> = q.fetch_all(&self.pool).await?;
        rows.into_iter().map(TryInto::try_into).collect()
    }

    async fn claim_next_task(&self, worker_id: Uuid) -> DomainResult<Option<Task>> {
        let now = chrono::Utc::now().to_rfc3339();
        let candidate: Option<(String,)> = sqlx::query_as(
            "SELECT id FROM tasks WHERE status = 'pending' AND (deadline IS NULL OR deadline > ?)
             ORDER BY priority DESC, created_at ASC, id ASC LIMIT 1",
        )
        .bind(&now)
        .fetch_optional(&self.pool)
        .await?;

        let Some((id_str,)) = candidate else {
            return Ok(None);
        };
        let task_id = super::parse_uuid(&id_str)?;

        self.claim_task_atomic(task_id, worker_id).await
    }

    async fn claim_task_atomic(&self, task_id: Uuid, worker_id: Uuid) -> DomainResult<Option<Task>> {
        let now = chrono::Utc::now().to_rfc3339();
        let result = sqlx::query(
            r#"UPDATE tasks
               SET status = 'assigned', worker_id = ?, version = version + 1,
                   updated_at = ?, claimed_at = ?
               WHERE id = ? AND status = 'pending'"#,
        )
        .bind(worker_id.to_string())
        .bind(&now)
        .bind(&now)
        .bind(task_id.to_string())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }

        self.get(task_id).await
    }

    async fn release_task(&self, task_id: Uuid, reason: &str) -> DomainResult<()> {
        let Some(mut task) = self.get(task_id).await? else {
            return Err(DomainError::TaskNotFound(task_id));
        };

        task.diagnostics.push(AttemptDiagnostic {
            attempt: task.attempt_count,
            worker_id: task.worker_id,
            reason: reason.to_string(),
            recorded_at: chrono::Utc::now(),
        });
        task.status = if task.attempt_count > task.max_attempts { TaskStatus::Abandoned } else { TaskStatus::Pending };
        task.worker_id = None;
        task.claimed_at = None;
        task.updated_at = chrono::Utc::now();

        self.update(&task).await
    }

    async fn count_by_status(&self, cycle_id: Option<Uuid>) -> DomainResult<HashMap<TaskStatus, u64>> {
        let rows: Vec<(String, i64)> = if let Some(cycle_id) = cycle_id {
            sqlx::query_as("SELECT status, COUNT(*) FROM tasks WHERE cycle_id = ? GROUP BY status")
                .bind(cycle_id.to_string())
                .fetch_all(&self.pool)
                .await?
        } else {
            sqlx::query_as("SELECT status, COUNT(*) FROM tasks GROUP BY status").fetch_all(&self.pool).await?
        };

        let mut counts = HashMap::new();
        for (status_str, count) in rows {
            if let Some(status) = TaskStatus::from_str(&status_str) {
                counts.insert(status, count as u64);
            }
        }
        Ok(counts)
    }

    async fn list_stalled(&self, stale_after_secs: i64) -> DomainResult<Vec<Task>> {
        let cutoff = (chrono::Utc::now() - chrono::Duration::seconds(stale_after_secs)).to_rfc3339();
        let rows: Vec<TaskRow> = sqlx::query_as(
            "SELECT * FROM tasks WHERE status = 'running' AND claimed_at IS NOT NULL AND claimed_at < ?",
        )
        .bind(cutoff)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(TryInto::try_into).collect()
    }
}

async fn insert_task(pool: &SqlitePool, task: &Task) -> DomainResult<()> {
    let affected_files_json = serde_json::to_string(&task.affected_files)?;
    let acceptance_criteria_json = serde_json::to_string(&task.acceptance_criteria)?;
    let tags_json = serde_json::to_string(&task.tags)?;
    let diagnostics_json = serde_json::to_string(&task.diagnostics)?;

    sqlx::query(
        r#"INSERT INTO tasks (id, cycle_id, title, description, affected_files, acceptance_criteria,
           priority, complexity, tags, deadline, status, worker_id, creator_agent_id, claimed_at,
           created_at, updated_at, version, attempt_count, max_attempts, diagnostics,
           branch_name, commit_id, verdict_cycle_id)
           VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"#,
    )
    .bind(task.id.to_string())
    .bind(task.cycle_id.map(|id| id.to_string()))
    .bind(&task.title)
    .bind(&task.description)
    .bind(&affected_files_json)
    .bind(&acceptance_criteria_json)
    .bind(i64::from(task.priority))
    .bind(task.complexity.as_str())
    .bind(&tags_json)
    .bind(task.deadline.map(|d| d.to_rfc3339()))
    .bind(task.status.as_str())
    .bind(task.worker_id.map(|id| id.to_string()))
    .bind(task.creator_agent_id.to_string())
    .bind(task.claimed_at.map(|d| d.to_rfc3339()))
    .bind(task.created_at.to_rfc3339())
    .bind(task.updated_at.to_rfc3339())
    .bind(task.version as i64)
    .bind(i64::from(task.attempt_count))
    .bind(i64::from(task.max_attempts))
    .bind(&diagnostics_json)
    .bind(&task.branch_name)
    .bind(&task.commit_id)
    .bind(task.verdict_cycle_id.map(|id| id.to_string()))
    .execute(pool)
    .await?;

    Ok(())
}

#[derive(sqlx::FromRow)]
struct TaskRow {
    id: String,
    cycle_id: Option<String>,
    title: String,
    description: String,
    affected_files: String,
    acceptance_criteria: String,
    priority: i64,
    complexity: String,
    tags: String,
    deadline: Option<String>,
    status: String,
    worker_id: Option<String>,
    creator_agent_id: String,
    claimed_at: Option<String>,
    created_at: String,
    updated_at: String,
    version: i64,
    attempt_count: i64,
    max_attempts: i64,
    diagnostics: String,
    branch_name: Option<String>,
    commit_id: Option<String>,
    verdict_cycle_id: Option<String>,
}

impl TryFrom<TaskRow> for Task {
    type Error = DomainError;

    fn try_from(row: TaskRow) -> Result<Self, Self::Error> {
        let status = TaskStatus::from_str(&row.status)
            .ok_or_else(|| DomainError::Serialization(format!("invalid status: {}", row.status)))?;
        let complexity = TaskComplexity::from_str(&row.complexity)
            .ok_or_else(|| DomainError::Serialization(format!("invalid complexity: {}", row.complexity)))?;

        Ok(Task {
            id: super::parse_uuid(&row.id)?,
            cycle_id: super::parse_optional_uuid(row.cycle_id)?,
            title: row.title,
            description: row.description,
            affected_files: serde_json::from_str(&row.affected_files)?,
            acceptance_criteria: serde_json::from_str(&row.acceptance_criteria)?,
            priority: row.priority as u8,
            complexity,
            tags: serde_json::from_str(&row.tags)?,
            deadline: super::parse_optional_datetime(row.deadline)?,
            status,
            worker_id: super::parse_optional_uuid(row.worker_id)?,
            creator_agent_id: super::parse_uuid(&row.creator_agent_id)?,
            claimed_at: super::parse_optional_datetime(row.claimed_at)?,
            created_at: super::parse_datetime(&row.created_at)?,
            updated_at: super::parse_datetime(&row.updated_at)?,
            version: row.version as u64,
            attempt_count: row.attempt_count as u32,
            max_attempts: row.max_attempts as u32,
            diagnostics: serde_json::from_str(&row.diagnostics)?,
            branch_name: row.branch_name,
            commit_id: row.commit_id,
            verdict_cycle_id: super::parse_optional_uuid(row.verdict_cycle_id)?,
        })
    }
}
