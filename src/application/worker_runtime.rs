//! Worker runtime: executes one claimed task on its own feature branch.

use std::path::Path;
use std::sync::Arc;

use tracing::{info, warn};
use uuid::Uuid;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{Task, TaskStatus};
use crate::domain::ports::{
    Clock, CompletionRequest, FsExecAdapter, MessageRole, ModelAdapter, ModelMessage, TaskStore, VcsAdapter,
};

const SYSTEM_PROMPT: &str = "You are a Worker in an autonomous development cycle. \
Given a task's title, description, and acceptance criteria, respond with ONLY a JSON object \
mapping each file path you need to write to its full new contents: {\"path/to/file\": \"contents\"}.";

/// Drives one Worker agent through a single claimed task: branch, model
/// call, file writes, commit.
pub struct WorkerRuntime {
    model: Arc<dyn ModelAdapter>,
    fs_exec: Arc<dyn FsExecAdapter>,
    vcs: Arc<dyn VcsAdapter>,
    task_store: Arc<dyn TaskStore>,
    clock: Arc<dyn Clock>,
}

impl WorkerRuntime {
    pub fn new(
        model: Arc<dyn ModelAdapter>,
        fs_exec: Arc<dyn FsExecAdapter>,
        vcs: Arc<dyn VcsAdapter>,
        task_store: Arc<dyn TaskStore>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self { model, fs_exec, vcs, task_store, clock }
    }

    /// Execute a task already claimed (status `assigned`) by `worker_id`.
    /// On success the task moves directly to `completed` with a branch
    /// and commit recorded; on failure it is released back to `pending`
    /// via [`TaskStore::release_task`] so a later attempt (or
    /// abandonment once `max_attempts` is exhausted) can take over. The
    /// Judge does not gate this outcome; it reviews the cycle's
    /// completed and failed tasks in aggregate once the cycle closes.
    pub async fn execute(&self, mut task: Task, worker_id: Uuid) -> DomainResult<Task> {
        if task.status != TaskStatus::Assigned && task.status != TaskStatus::Running {
            return Err(DomainError::InvalidStateTransition {
                from: task.status.as_str().to_string(),
                to: TaskStatus::Running.as_str().to_string(),
            });
        }

        let now = self.clock.now();
        task.status = TaskStatus::Running;
        task.updated_at = now;
        self.task_store.update(&task).await?;

        match self.run(&task).await {
            Ok((branch_name, commit_id)) => {
                task.status = TaskStatus::Completed;
                task.branch_name = Some(branch_name);
                task.commit_id = Some(commit_id);
                task.updated_at = self.clock.now();
                self.task_store.update(&task).await?;
                info!(task_id = %task.id, worker_id = %worker_id, "worker completed task");
                Ok(task)
            }
            Err(e) => {
                warn!(task_id = %task.id, worker_id = %worker_id, error = %e, "worker attempt failed");
                task.attempt_count += 1;
                task.updated_at = self.clock.now();
                self.task_store.update(&task).await?;
                self.task_store.release_task(task.id, &e.to_string()).await?;
                Err(e)
            }
        }
    }

    async fn run(&self, task: &Task) -> DomainResult<(String, String)> {
        let branch_name = format!("feature/{}", task.id);
        self.vcs.create_branch(&branch_name).await?;

        let prompt = format!(
            "Title: {}\nDescription: {}\nAcceptance criteria:\n{}\nAffected files: {}",
            task.title,
            task.description,
            task.acceptance_criteria.iter().map(|c| format!("- {c}")).collect::<Vec<_>>().join("\n"),
            task.affected_files.join(", "),
        );

        let request = CompletionRequest {
            messages: vec![
                ModelMessage { role: MessageRole::System, content: SYSTEM_PROMPT.to_string() },
                ModelMessage { role: MessageRole::User, content: prompt },
            ],
            max_tokens: 8192,
            temperature: 0.2,
        };

        let response = self.model.complete(request).await?;
        let files: std::collections::BTreeMap<String, String> = serde_json::from_str(response.content.trim())
            .map_err(|e| DomainError::ValidationFailed(format!("worker response was not valid JSON: {e}")))?;

        if files.is_empty() {
            return Err(DomainError::ValidationFailed("worker produced no file changes".to_string()));
        }

        for (path, contents) in &files {
            self.fs_exec.write_file(Path::new(path), contents).await?;
        }

        let commit_message = format!("{}\n\nTask: {}", task.title, task.id);
        let commit_id = self.vcs.commit_all(&branch_name, &commit_message).await?;
        Ok((branch_name, commit_id))
    }
}
