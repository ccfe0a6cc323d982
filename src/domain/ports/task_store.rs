//! Task store port: the shared queue that Planners write to and Workers
//! claim from.

use async_trait::async_trait;
use std::collections::HashMap;
use uuid::Uuid;

use crate::domain::errors::DomainResult;
use crate::domain::models::{Task, TaskDraft, TaskStatus};

/// Filter criteria for listing tasks.
#[derive(Debug, Clone, Default)]
pub struct TaskFilter {
    pub status: Option<TaskStatus>,
    pub cycle_id: Option<Uuid>,
    pub worker_id: Option<Uuid>,
}

/// Persistence interface for the task queue.
///
/// Implementations must make [`TaskStore::claim_next_task`] atomic: two
/// workers racing for the same pending task must never both win (P1).
#[async_trait]
pub trait TaskStore: Send + Sync {
    /// Insert a freshly planned task.
    async fn create(&self, draft: TaskDraft) -> DomainResult<Task>;

    /// Fetch a task by id.
    async fn get(&self, id: Uuid) -> DomainResult<Option<Task>>;

    /// Persist a task whose fields were mutated in place, enforcing
    /// optimistic-lock semantics: `task.version` must match the stored
    /// version or the write is rejected with `StaleVersion`.
    async fn update(&self, task: &Task) -> DomainResult<()>;

    /// List tasks matching a filter, newest first.
    async fn list(&self, filter: TaskFilter) -> DomainResult<Vec<Task>>;

    /// Atomically claim the highest-priority pending task for a worker.
    /// Returns `Ok(None)` if no pending task exists or the race was lost.
    async fn claim_next_task(&self, worker_id: Uuid) -> DomainResult<Option<Task>>;

    /// Atomically claim a specific task for a worker (used by tests and
    /// by callers that already selected a task id). Returns `Ok(None)`
    /// if the task is not in `pending` status when the claim runs.
    async fn claim_task_atomic(&self, task_id: Uuid, worker_id: Uuid) -> DomainResult<Option<Task>>;

    /// Release a claimed task back to `pending` (used on worker stall
    /// detection or graceful revocation, I4).
    async fn release_task(&self, task_id: Uuid, reason: &str) -> DomainResult<()>;

    /// Count tasks grouped by status, used for quiescence detection (L1).
    async fn count_by_status(&self, cycle_id: Option<Uuid>) -> DomainResult<HashMap<TaskStatus, u64>>;

    /// Tasks claimed longer ago than `stale_after_secs` and still
    /// `running`, used by the stall detector (L3).
    async fn list_stalled(&self, stale_after_secs: i64) -> DomainResult<Vec<Task>>;
}
