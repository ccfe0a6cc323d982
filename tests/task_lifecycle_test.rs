//! Black-box coverage of the single-task happy path (S1) and the
//! concurrent-claim race (S2) using the real sqlite-backed stores.

mod common;

use std::sync::Arc;

use conclave::adapters::fs_exec::SandboxedFsExec;
use conclave::adapters::model::MockModelAdapter;
use conclave::adapters::vcs::GitCliAdapter;
use conclave::application::{JudgeRuntime, PlannerRuntime, WorkerRuntime};
use conclave::domain::models::{TaskStatus, VerdictDecision};
use conclave::domain::ports::{SystemClock, TaskStore};
use uuid::Uuid;

/// S1: a single planned task is claimed and executed to `completed` with
/// no other agents contending for it, then the cycle's Judge renders a
/// `continue` verdict over it.
#[tokio::test]
async fn single_task_happy_path_reaches_completed() {
    let repo = common::init_repo();
    let stores = common::stores().await;
    let cycle_id = Uuid::new_v4();

    let planner_model = Arc::new(MockModelAdapter::always(
        r#"[{"title": "Add greeting", "description": "Write a greeting file",
            "affected_files": ["greeting.txt"], "acceptance_criteria": ["greeting.txt exists"]}]"#,
    ));
    let planner = PlannerRuntime::new(planner_model, Arc::new(stores.task_store.clone()), Arc::new(SystemClock), 3);
    let created = planner.plan_cycle(cycle_id, Uuid::new_v4(), "empty repo").await.unwrap();
    assert_eq!(created.len(), 1);
    let task_id = created[0].id;

    let worker_id = Uuid::new_v4();
    let claimed = stores.task_store.claim_task_atomic(task_id, worker_id).await.unwrap().unwrap();
    assert_eq!(claimed.status, TaskStatus::Assigned);

    let worker_model = Arc::new(MockModelAdapter::always(r#"{"greeting.txt": "hello\n"}"#));
    let worker = WorkerRuntime::new(
        worker_model,
        Arc::new(SandboxedFsExec::new(common::repo_path(&repo))),
        Arc::new(GitCliAdapter::new(common::repo_path(&repo), "main".to_string())),
        Arc::new(stores.task_store.clone()),
        Arc::new(SystemClock),
    );
    let executed = worker.execute(claimed, worker_id).await.unwrap();
    assert_eq!(executed.status, TaskStatus::Completed);
    assert!(repo.path().join("greeting.txt").exists());

    let judge_model = Arc::new(MockModelAdapter::always(
        r#"{"decision": "continue", "approved_count": 1, "rejected_count": 0, "metrics": {}, "reasoning": "clean cycle"}"#,
    ));
    let judge = JudgeRuntime::new(
        judge_model,
        Arc::new(stores.task_store.clone()),
        Arc::new(stores.verdict_store.clone()),
        Arc::new(SystemClock),
    );
    let verdict = judge.judge_cycle(cycle_id, Uuid::new_v4()).await.unwrap();
    assert_eq!(verdict.decision, VerdictDecision::Continue);

    let final_task = stores.task_store.get(task_id).await.unwrap().unwrap();
    assert_eq!(final_task.status, TaskStatus::Completed);
    assert_eq!(final_task.verdict_cycle_id, Some(cycle_id));
}

/// S2: when two workers race to claim the same pending task, exactly
/// one wins and the other observes `Ok(None)` (P1).
#[tokio::test]
async fn concurrent_claim_race_has_exactly_one_winner() {
    let stores = common::stores().await;
    let planner_model = Arc::new(MockModelAdapter::always(
        r#"[{"title": "Contested task", "description": "d", "acceptance_criteria": ["n/a"]}]"#,
    ));
    let planner = PlannerRuntime::new(planner_model, Arc::new(stores.task_store.clone()), Arc::new(SystemClock), 3);
    let created = planner.plan_cycle(Uuid::new_v4(), Uuid::new_v4(), "repo").await.unwrap();
    let task_id = created[0].id;

    let task_store: Arc<dyn TaskStore> = Arc::new(stores.task_store.clone());
    let (worker_a, worker_b) = (Uuid::new_v4(), Uuid::new_v4());

    let store_a = Arc::clone(&task_store);
    let store_b = Arc::clone(&task_store);
    let claim_a = tokio::spawn(async move { store_a.claim_task_atomic(task_id, worker_a).await });
    let claim_b = tokio::spawn(async move { store_b.claim_task_atomic(task_id, worker_b).await });

    let (result_a, result_b) = tokio::join!(claim_a, claim_b);
    let winners = [result_a.unwrap().unwrap(), result_b.unwrap().unwrap()];
    let won_count = winners.iter().filter(|w| w.is_some()).count();
    assert_eq!(won_count, 1, "exactly one racer should win the claim");
}
