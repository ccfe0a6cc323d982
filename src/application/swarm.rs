//! Swarm facade: wires the [`CycleController`], [`AgentSupervisor`], and
//! the three role runtimes into the concurrent worker-pool shape used
//! for long-running agent supervision elsewhere in this codebase -
//! a semaphore-bounded pool of tokio tasks feeding completion events
//! back through an mpsc channel, torn down via a broadcast shutdown.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{mpsc, Semaphore};
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::application::{AgentSupervisor, CycleController, JudgeRuntime, PlannerRuntime, StallMonitor, WorkerRuntime};
use crate::domain::errors::DomainResult;
use crate::domain::models::{AgentRole, Config};
use crate::domain::ports::{
    AgentStore, Clock, CycleStore, FsExecAdapter, ModelAdapter, TaskStore, VcsAdapter, VerdictStore,
};

/// Outcome of one worker or judge completing its unit of work, fed back
/// to the swarm loop for bookkeeping.
enum SwarmEvent {
    TaskExecuted { task_id: Uuid },
    CycleJudged { cycle_id: Uuid },
}

/// Ties every application-layer runtime together into one supervised
/// process: register agents, open a cycle, plan it, drain the queue
/// with bounded concurrency, judge what comes back, and repeat.
pub struct Swarm {
    config: Config,
    task_store: Arc<dyn TaskStore>,
    verdict_store: Arc<dyn VerdictStore>,
    cycle_controller: Arc<CycleController>,
    supervisor: Arc<AgentSupervisor>,
    stall_monitor: Arc<StallMonitor>,
    planner: Arc<PlannerRuntime>,
    worker: Arc<WorkerRuntime>,
    judge: Arc<JudgeRuntime>,
}

impl Swarm {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        config: Config,
        task_store: Arc<dyn TaskStore>,
        agent_store: Arc<dyn AgentStore>,
        cycle_store: Arc<dyn CycleStore>,
        verdict_store: Arc<dyn VerdictStore>,
        model: Arc<dyn ModelAdapter>,
        fs_exec: Arc<dyn FsExecAdapter>,
        vcs: Arc<dyn VcsAdapter>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let cycle_controller = Arc::new(CycleController::new(
            Arc::clone(&cycle_store),
            Arc::clone(&task_store),
            Arc::clone(&verdict_store),
            Arc::clone(&clock),
            config.clone(),
        ));
        let supervisor = Arc::new(AgentSupervisor::new(agent_store, Arc::clone(&clock), config.orchestrator.agent_error_ceiling));
        let stall_monitor = Arc::new(StallMonitor::new(
            Arc::clone(&task_store),
            Arc::clone(&supervisor),
            Arc::clone(&clock),
            config.orchestrator.stall_timeout_secs,
        ));
        let planner = Arc::new(PlannerRuntime::new(
            Arc::clone(&model),
            Arc::clone(&task_store),
            Arc::clone(&clock),
            config.orchestrator.max_attempts_per_task,
        ));
        let worker =
            Arc::new(WorkerRuntime::new(Arc::clone(&model), fs_exec, vcs, Arc::clone(&task_store), Arc::clone(&clock)));
        let judge = Arc::new(JudgeRuntime::new(model, Arc::clone(&task_store), Arc::clone(&verdict_store), clock));

        Self { config, task_store, verdict_store, cycle_controller, supervisor, stall_monitor, planner, worker, judge }
    }

    /// Run until `shutdown` resolves. Registers the configured roster of
    /// Planner/Worker/Judge agents, then loops: plan the open cycle,
    /// drain ready work with a bounded worker pool, judge completed
    /// attempts, and let the cycle controller's own background loop
    /// advance phases and roll the cycle over.
    pub async fn run(&self, shutdown: impl std::future::Future<Output = ()>) -> DomainResult<()> {
        self.cycle_controller.start().await?;

        let planner_agent = self.supervisor.spawn(AgentRole::Planner).await?;
        let judge_agent = self.supervisor.spawn(AgentRole::Judge).await?;
        for _ in 0..self.config.orchestrator.max_concurrent_workers {
            self.supervisor.spawn(AgentRole::Worker).await?;
        }

        let semaphore = Arc::new(Semaphore::new(self.config.orchestrator.max_concurrent_workers));
        let (event_tx, mut event_rx) = mpsc::channel::<SwarmEvent>(1000);
        let mut in_flight: HashMap<Uuid, ()> = HashMap::new();
        let mut judging_in_flight: Option<Uuid> = None;

        let mut poll = tokio::time::interval(std::time::Duration::from_millis(self.config.orchestrator.claim_poll_interval_ms.max(50)));
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                _ = poll.tick() => {
                    let revoked = self.stall_monitor.sweep().await?;
                    if revoked > 0 {
                        warn!(revoked, "stalled tasks revoked this pass");
                    }

                    let stats = self.cycle_controller.stats().await;
                    let Some(cycle_id) = stats.cycle_id else { continue };

                    match stats.phase {
                        Some(crate::domain::models::CyclePhase::Planning) => {
                            if self.plan_if_empty(cycle_id, planner_agent.id).await? {
                                self.cycle_controller.mark_planning_complete().await?;
                            }
                        }
                        Some(crate::domain::models::CyclePhase::Executing) => {
                            self.top_up_workers().await?;
                            let worker_ids =
                                self.supervisor.available(AgentRole::Worker).await?.into_iter().map(|a| a.id).collect();
                            self.drain_ready_tasks(&semaphore, &event_tx, &mut in_flight, worker_ids).await?;
                        }
                        Some(crate::domain::models::CyclePhase::Judging) => {
                            self.judge_cycle_once(cycle_id, judge_agent.id, &event_tx, &mut judging_in_flight).await?;
                        }
                        _ => {}
                    }
                }
                Some(event) = event_rx.recv() => {
                    match event {
                        SwarmEvent::TaskExecuted { task_id } => {
                            in_flight.remove(&task_id);
                        }
                        SwarmEvent::CycleJudged { cycle_id } => {
                            if judging_in_flight == Some(cycle_id) {
                                judging_in_flight = None;
                            }
                        }
                    }
                }
                () = &mut shutdown => {
                    info!("swarm received shutdown signal");
                    break;
                }
            }
        }

        self.cycle_controller.stop().await?;
        Ok(())
    }

    /// Plan the cycle if it has no tasks yet. Returns `true` once
    /// planning work for this cycle is done (either just produced or
    /// already present from a prior pass).
    async fn plan_if_empty(&self, cycle_id: Uuid, planner_id: Uuid) -> DomainResult<bool> {
        let counts = self.task_store.count_by_status(Some(cycle_id)).await?;
        if !counts.is_empty() {
            return Ok(true);
        }
        match self.planner.plan_cycle(cycle_id, planner_id, "repository summary unavailable").await {
            Ok(created) => Ok(!created.is_empty()),
            Err(e) => {
                warn!(error = %e, "planner failed to produce any tasks this pass");
                Ok(false)
            }
        }
    }

    /// Replenish the Worker roster up to `max_concurrent_workers`,
    /// spawning fresh replacements for any retired by stall penalties or
    /// repeated execution failures.
    async fn top_up_workers(&self) -> DomainResult<()> {
        let available = self.supervisor.available(AgentRole::Worker).await?.len();
        let target = self.config.orchestrator.max_concurrent_workers;
        for _ in available..target {
            self.supervisor.spawn(AgentRole::Worker).await?;
        }
        Ok(())
    }

    async fn drain_ready_tasks(
        &self,
        semaphore: &Arc<Semaphore>,
        event_tx: &mpsc::Sender<SwarmEvent>,
        in_flight: &mut HashMap<Uuid, ()>,
        worker_ids: Vec<Uuid>,
    ) -> DomainResult<()> {
        for worker_id in worker_ids {
            if semaphore.available_permits() == 0 {
                break;
            }
            let Some(task) = self.task_store.claim_next_task(worker_id).await? else { continue };
            if in_flight.contains_key(&task.id) {
                continue;
            }
            in_flight.insert(task.id, ());

            let permit = Arc::clone(semaphore).acquire_owned().await.expect("semaphore not closed");
            let worker = Arc::clone(&self.worker);
            let supervisor = Arc::clone(&self.supervisor);
            let tx = event_tx.clone();
            let task_id = task.id;

            tokio::spawn(async move {
                let _permit = permit;
                match worker.execute(task, worker_id).await {
                    Ok(_) => {
                        let _ = supervisor.record_success(worker_id).await;
                    }
                    Err(e) => {
                        error!(task_id = %task_id, error = %e, "worker execution failed");
                        let _ = supervisor.record_error(worker_id, &e.to_string()).await;
                    }
                }
                let _ = tx.send(SwarmEvent::TaskExecuted { task_id }).await;
            });
        }
        Ok(())
    }

    /// Invoke the Judge exactly once per cycle: a no-op if a verdict is
    /// already recorded for it or a judging call is already in flight.
    async fn judge_cycle_once(
        &self,
        cycle_id: Uuid,
        judge_id: Uuid,
        event_tx: &mpsc::Sender<SwarmEvent>,
        judging_in_flight: &mut Option<Uuid>,
    ) -> DomainResult<()> {
        if *judging_in_flight == Some(cycle_id) {
            return Ok(());
        }
        if self.verdict_store.get_for_cycle(cycle_id).await?.is_some() {
            return Ok(());
        }
        *judging_in_flight = Some(cycle_id);

        let judge = Arc::clone(&self.judge);
        let supervisor = Arc::clone(&self.supervisor);
        let tx = event_tx.clone();

        tokio::spawn(async move {
            match judge.judge_cycle(cycle_id, judge_id).await {
                Ok(verdict) => {
                    info!(cycle_id = %cycle_id, decision = verdict.decision.as_str(), "cycle judged");
                    let _ = supervisor.record_success(judge_id).await;
                }
                Err(e) => {
                    error!(cycle_id = %cycle_id, error = %e, "judge failed to render a cycle verdict");
                    let _ = supervisor.record_error(judge_id, &e.to_string()).await;
                }
            }
            let _ = tx.send(SwarmEvent::CycleJudged { cycle_id }).await;
        });
        Ok(())
    }
}
