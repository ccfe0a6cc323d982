//! Judge runtime: invoked once per cycle by the `CycleController` to
//! render a single continuation decision over all of that cycle's
//! terminal tasks.

use std::sync::Arc;

use serde::Deserialize;
use tracing::{info, warn};
use uuid::Uuid;

use crate::application::validation::validate_verdict;
use crate::domain::errors::DomainResult;
use crate::domain::models::{Task, TaskStatus, Verdict, VerdictDecision};
use crate::domain::ports::{
    Clock, CompletionRequest, MessageRole, ModelAdapter, ModelMessage, TaskFilter, TaskStore, VerdictStore,
};

const SYSTEM_PROMPT: &str = "You are the Judge presiding over one development cycle. \
Given the cycle's completed, failed, and abandoned tasks, decide whether the swarm should \
continue. Respond with ONLY a JSON object: {\"decision\": \"continue\"|\"pause\"|\"halt\", \
\"approved_count\": integer, \"rejected_count\": integer, \"metrics\": object, \"reasoning\": string}.";

#[derive(Debug, Deserialize)]
struct ProposedVerdict {
    decision: String,
    approved_count: u32,
    rejected_count: u32,
    #[serde(default)]
    metrics: serde_json::Value,
    reasoning: String,
}

pub struct JudgeRuntime {
    model: Arc<dyn ModelAdapter>,
    task_store: Arc<dyn TaskStore>,
    verdict_store: Arc<dyn VerdictStore>,
    clock: Arc<dyn Clock>,
}

impl JudgeRuntime {
    pub fn new(
        model: Arc<dyn ModelAdapter>,
        task_store: Arc<dyn TaskStore>,
        verdict_store: Arc<dyn VerdictStore>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self { model, task_store, verdict_store, clock }
    }

    /// Render the cycle's verdict: gather its terminal tasks, ask the
    /// model for one continuation decision, validate and persist it,
    /// and stamp every considered task with the cycle it was judged in.
    pub async fn judge_cycle(&self, cycle_id: Uuid, judge_id: Uuid) -> DomainResult<Verdict> {
        let tasks = self.task_store.list(TaskFilter { cycle_id: Some(cycle_id), ..Default::default() }).await?;
        let terminal: Vec<Task> = tasks
            .into_iter()
            .filter(|t| matches!(t.status, TaskStatus::Completed | TaskStatus::Failed | TaskStatus::Abandoned))
            .collect();

        let summary = terminal
            .iter()
            .map(|t| format!("- [{}] {} (attempts: {})", t.status.as_str(), t.title, t.attempt_count))
            .collect::<Vec<_>>()
            .join("\n");
        let prompt = format!("Cycle {cycle_id} tasks:\n{}", if summary.is_empty() { "<none>".to_string() } else { summary });

        let request = CompletionRequest {
            messages: vec![
                ModelMessage { role: MessageRole::System, content: SYSTEM_PROMPT.to_string() },
                ModelMessage { role: MessageRole::User, content: prompt },
            ],
            max_tokens: 1024,
            temperature: 0.0,
        };

        let now = self.clock.now();
        let verdict = match self.model.complete(request).await {
            Ok(response) => match serde_json::from_str::<ProposedVerdict>(response.content.trim()) {
                Ok(proposed) => {
                    let reviewed_count = terminal.len() as u32;
                    let decision = VerdictDecision::from_str(&proposed.decision);
                    let v = Verdict {
                        id: Uuid::new_v4(),
                        cycle_id,
                        judge_id,
                        decision: decision.unwrap_or(VerdictDecision::Pause),
                        reviewed_count,
                        approved_count: proposed.approved_count,
                        rejected_count: proposed.rejected_count,
                        metrics: proposed.metrics,
                        reasoning: proposed.reasoning,
                        recorded_at: now,
                    };
                    if decision.is_none() {
                        warn!(cycle_id = %cycle_id, raw = %proposed.decision, "judge proposed unknown decision, defaulting to pause");
                    }
                    if !v.counts_consistent() {
                        warn!(cycle_id = %cycle_id, "judge verdict counts inconsistent, defaulting to pause");
                        Verdict { decision: VerdictDecision::Pause, ..v }
                    } else {
                        v
                    }
                }
                Err(e) => {
                    warn!(cycle_id = %cycle_id, error = %e, "judge response was not valid JSON, defaulting to pause");
                    Verdict {
                        id: Uuid::new_v4(),
                        cycle_id,
                        judge_id,
                        decision: VerdictDecision::Pause,
                        reviewed_count: terminal.len() as u32,
                        approved_count: 0,
                        rejected_count: 0,
                        metrics: serde_json::json!({}),
                        reasoning: format!("judge response malformed: {e}"),
                        recorded_at: now,
                    }
                }
            },
            Err(e) => {
                warn!(cycle_id = %cycle_id, error = %e, "judge model call failed, defaulting to pause");
                Verdict {
                    id: Uuid::new_v4(),
                    cycle_id,
                    judge_id,
                    decision: VerdictDecision::Pause,
                    reviewed_count: terminal.len() as u32,
                    approved_count: 0,
                    rejected_count: 0,
                    metrics: serde_json::json!({}),
                    reasoning: format!("judge model call failed: {e}"),
                    recorded_at: now,
                }
            }
        };

        validate_verdict(&verdict)?;
        let recorded = self.verdict_store.record(verdict).await?;
        info!(cycle_id = %cycle_id, decision = recorded.decision.as_str(), "cycle verdict recorded");

        for mut task in terminal {
            task.verdict_cycle_id = Some(cycle_id);
            task.updated_at = now;
            self.task_store.update(&task).await?;
        }

        Ok(recorded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::model::MockModelAdapter;
    use crate::adapters::sqlite::{create_migrated_test_pool, SqliteTaskStore, SqliteVerdictStore};
    use crate::domain::models::{TaskComplexity, TaskDraft};
    use crate::domain::ports::SystemClock;

    async fn terminal_task(task_store: &SqliteTaskStore, cycle_id: Uuid, status: TaskStatus) -> Task {
        let draft = TaskDraft {
            cycle_id: Some(cycle_id),
            title: "Add greeting".to_string(),
            description: "d".to_string(),
            affected_files: vec![],
            acceptance_criteria: vec!["greeting.txt exists".to_string()],
            priority: 5,
            complexity: TaskComplexity::Low,
            tags: vec![],
            deadline: None,
            creator_agent_id: Uuid::new_v4(),
            max_attempts: 3,
        };
        let mut task = task_store.create(draft).await.unwrap();
        task.status = status;
        task_store.update(&task).await.unwrap();
        task_store.get(task.id).await.unwrap().unwrap()
    }

    #[tokio::test]
    async fn continue_decision_is_recorded_and_tasks_stamped() {
        let pool = create_migrated_test_pool().await.unwrap();
        let task_store = Arc::new(SqliteTaskStore::new(pool.clone()));
        let verdict_store = Arc::new(SqliteVerdictStore::new(pool));
        let cycle_id = Uuid::new_v4();
        let task = terminal_task(&task_store, cycle_id, TaskStatus::Completed).await;

        let model = Arc::new(MockModelAdapter::always(
            r#"{"decision": "continue", "approved_count": 1, "rejected_count": 0, "metrics": {"test_pass_ratio": 1.0}, "reasoning": "clean cycle"}"#,
        ));
        let judge = JudgeRuntime::new(model, task_store.clone(), verdict_store, Arc::new(SystemClock));
        let verdict = judge.judge_cycle(cycle_id, Uuid::new_v4()).await.unwrap();

        assert_eq!(verdict.decision, VerdictDecision::Continue);
        assert_eq!(verdict.reviewed_count, 1);
        let reloaded = task_store.get(task.id).await.unwrap().unwrap();
        assert_eq!(reloaded.verdict_cycle_id, Some(cycle_id));
    }

    #[tokio::test]
    async fn inconsistent_counts_default_to_pause() {
        let pool = create_migrated_test_pool().await.unwrap();
        let task_store = Arc::new(SqliteTaskStore::new(pool.clone()));
        let verdict_store = Arc::new(SqliteVerdictStore::new(pool));
        let cycle_id = Uuid::new_v4();
        terminal_task(&task_store, cycle_id, TaskStatus::Completed).await;

        let model = Arc::new(MockModelAdapter::always(
            r#"{"decision": "continue", "approved_count": 5, "rejected_count": 5, "metrics": {}, "reasoning": "miscounted"}"#,
        ));
        let judge = JudgeRuntime::new(model, task_store.clone(), verdict_store, Arc::new(SystemClock));
        let verdict = judge.judge_cycle(cycle_id, Uuid::new_v4()).await.unwrap();

        assert_eq!(verdict.decision, VerdictDecision::Pause);
    }

    #[tokio::test]
    async fn malformed_response_defaults_to_pause() {
        let pool = create_migrated_test_pool().await.unwrap();
        let task_store = Arc::new(SqliteTaskStore::new(pool.clone()));
        let verdict_store = Arc::new(SqliteVerdictStore::new(pool));
        let cycle_id = Uuid::new_v4();
        terminal_task(&task_store, cycle_id, TaskStatus::Failed).await;

        let model = Arc::new(MockModelAdapter::always("not json"));
        let judge = JudgeRuntime::new(model, task_store.clone(), verdict_store, Arc::new(SystemClock));
        let verdict = judge.judge_cycle(cycle_id, Uuid::new_v4()).await.unwrap();

        assert_eq!(verdict.decision, VerdictDecision::Pause);
    }
}
