//! Planner runtime: turns a model's proposal into validated tasks on the
//! shared queue.

use std::sync::Arc;

use serde::Deserialize;
use tracing::{info, warn};
use uuid::Uuid;

use crate::application::validation::validate_task_draft;
use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{Task, TaskComplexity, TaskDraft};
use crate::domain::ports::{Clock, CompletionRequest, MessageRole, ModelAdapter, ModelMessage, TaskStore};

const SYSTEM_PROMPT: &str = "You are the Planner in an autonomous development cycle. \
Given the current repository state, propose a JSON array of tasks for Workers to execute. \
Respond with ONLY a JSON array, no prose. Each element: {\"title\", \"description\", \
\"affected_files\": [string], \"acceptance_criteria\": [string], \"priority\": 0-10, \
\"complexity\": \"low\"|\"medium\"|\"high\", \"tags\": [string]}.";

/// Wire shape of one Planner-proposed task, parsed out of the model's
/// response before it is promoted to a validated [`TaskDraft`].
#[derive(Debug, Deserialize)]
struct ProposedTask {
    title: String,
    description: String,
    #[serde(default)]
    affected_files: Vec<String>,
    #[serde(default)]
    acceptance_criteria: Vec<String>,
    #[serde(default = "default_priority")]
    priority: u8,
    #[serde(default = "default_complexity")]
    complexity: String,
    #[serde(default)]
    tags: Vec<String>,
}

fn default_priority() -> u8 {
    5
}

fn default_complexity() -> String {
    "medium".to_string()
}

/// Drives one Planner agent: prompts the model for a batch of tasks and
/// persists every draft that survives validation.
pub struct PlannerRuntime {
    model: Arc<dyn ModelAdapter>,
    task_store: Arc<dyn TaskStore>,
    clock: Arc<dyn Clock>,
    max_attempts_per_task: u32,
}

impl PlannerRuntime {
    pub fn new(
        model: Arc<dyn ModelAdapter>,
        task_store: Arc<dyn TaskStore>,
        clock: Arc<dyn Clock>,
        max_attempts_per_task: u32,
    ) -> Self {
        Self { model, task_store, clock, max_attempts_per_task }
    }

    /// Ask the model for a batch of tasks for `cycle_id` and persist the
    /// ones that pass validation. Malformed entries are logged and
    /// skipped rather than aborting the whole batch.
    pub async fn plan_cycle(
        &self,
        cycle_id: Uuid,
        planner_id: Uuid,
        repository_summary: &str,
    ) -> DomainResult<Vec<Task>> {
        let request = CompletionRequest {
            messages: vec![
                ModelMessage { role: MessageRole::System, content: SYSTEM_PROMPT.to_string() },
                ModelMessage { role: MessageRole::User, content: repository_summary.to_string() },
            ],
            max_tokens: 4096,
            temperature: 0.4,
        };

        let response = self.model.complete(request).await?;
        let proposals: Vec<ProposedTask> = serde_json::from_str(response.content.trim())
            .map_err(|e| DomainError::ValidationFailed(format!("planner response was not valid JSON: {e}")))?;

        let mut created = Vec::with_capacity(proposals.len());
        for proposal in proposals {
            let draft = TaskDraft {
                cycle_id: Some(cycle_id),
                title: proposal.title,
                description: proposal.description,
                affected_files: proposal.affected_files,
                acceptance_criteria: proposal.acceptance_criteria,
                priority: proposal.priority,
                complexity: TaskComplexity::from_str(&proposal.complexity).unwrap_or(TaskComplexity::Medium),
                tags: proposal.tags,
                deadline: None,
                creator_agent_id: planner_id,
                max_attempts: self.max_attempts_per_task,
            };

            if let Err(e) = validate_task_draft(&draft) {
                warn!(error = %e, title = %draft.title, "dropping invalid planner draft");
                continue;
            }

            let task = self.task_store.create(draft).await?;
            info!(task_id = %task.id, title = %task.title, "planner created task");
            created.push(task);
        }

        let _ = self.clock.now();
        Ok(created)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::model::MockModelAdapter;
    use crate::adapters::sqlite::{create_migrated_test_pool, SqliteTaskStore};
    use crate::domain::ports::SystemClock;

    #[tokio::test]
    async fn plans_valid_tasks_and_skips_malformed_ones() {
        let pool = create_migrated_test_pool().await.unwrap();
        let task_store = Arc::new(SqliteTaskStore::new(pool));
        let model = Arc::new(MockModelAdapter::always(
            r#"[
                {"title": "Add CLI flag", "description": "Expose --verbose", "acceptance_criteria": ["flag is parsed"]},
                {"title": "", "description": "missing title should be dropped", "acceptance_criteria": ["n/a"]}
            ]"#,
        ));
        let runtime = PlannerRuntime::new(model, task_store.clone(), Arc::new(SystemClock), 3);

        let created = runtime.plan_cycle(Uuid::new_v4(), Uuid::new_v4(), "repo summary").await.unwrap();
        assert_eq!(created.len(), 1);
        assert_eq!(created[0].title, "Add CLI flag");
    }

    #[tokio::test]
    async fn rejects_non_json_response() {
        let pool = create_migrated_test_pool().await.unwrap();
        let task_store = Arc::new(SqliteTaskStore::new(pool));
        let model = Arc::new(MockModelAdapter::always("not json"));
        let runtime = PlannerRuntime::new(model, task_store, Arc::new(SystemClock), 3);

        let result = runtime.plan_cycle(Uuid::new_v4(), Uuid::new_v4(), "repo summary").await;
        assert!(result.is_err());
    }
}
