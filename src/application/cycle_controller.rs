//! Cycle controller: drives the Plan -> Execute -> Judge round using the
//! same background-task-plus-broadcast-shutdown shape used elsewhere in
//! this codebase for long-running supervised loops.

use std::sync::Arc;

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use tokio::sync::{broadcast, RwLock};
use tokio::task::JoinHandle;
use tokio::time::{interval, Duration};
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::domain::errors::DomainResult;
use crate::domain::models::{Config, Cycle, CyclePhase, TaskStatus, Verdict, VerdictDecision};
use crate::domain::ports::{Clock, CycleStore, TaskFilter, TaskStore, VerdictStore};

/// Controller state, mirroring the run/stop lifecycle of a supervised
/// background loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControllerState {
    Stopped,
    Starting,
    Running,
    Stopping,
}

/// Snapshot of controller progress, surfaced to the CLI's `status` command.
#[derive(Debug, Clone)]
pub struct ControllerStats {
    pub state: ControllerState,
    pub cycle_id: Option<Uuid>,
    pub phase: Option<CyclePhase>,
    pub cycles_completed: u64,
    /// Whether the system is parked: the current cycle is closed and no
    /// new one will open until an operator clears the pause flag.
    pub parked: bool,
}

/// Drives cycles forward by polling task-queue quiescence (L1) rather
/// than owning agent execution directly: [`crate::application::agent_supervisor::AgentSupervisor`]
/// and the role runtimes are invoked by the caller, which observes phase
/// transitions via [`CycleController::stats`] and reports planning
/// completion via [`CycleController::mark_planning_complete`].
pub struct CycleController {
    state: Arc<RwLock<ControllerState>>,
    current_cycle: Arc<RwLock<Option<Cycle>>>,
    /// When the current phase was entered, used to enforce the hard
    /// per-phase window timeouts alongside quiescence detection. Reset
    /// to "now" on resume rather than recovered from storage, so a
    /// restart gives the in-progress phase a fresh window.
    phase_entered_at: Arc<RwLock<DateTime<Utc>>>,
    cycles_completed: Arc<RwLock<u64>>,

    cycle_store: Arc<dyn CycleStore>,
    task_store: Arc<dyn TaskStore>,
    verdict_store: Arc<dyn VerdictStore>,
    clock: Arc<dyn Clock>,
    config: Config,

    shutdown_tx: broadcast::Sender<()>,
    loop_handle: Arc<RwLock<Option<JoinHandle<DomainResult<()>>>>>,
}

impl CycleController {
    pub fn new(
        cycle_store: Arc<dyn CycleStore>,
        task_store: Arc<dyn TaskStore>,
        verdict_store: Arc<dyn VerdictStore>,
        clock: Arc<dyn Clock>,
        config: Config,
    ) -> Self {
        let (shutdown_tx, _) = broadcast::channel(1);
        let now = clock.now();
        Self {
            state: Arc::new(RwLock::new(ControllerState::Stopped)),
            current_cycle: Arc::new(RwLock::new(None)),
            phase_entered_at: Arc::new(RwLock::new(now)),
            cycles_completed: Arc::new(RwLock::new(0)),
            cycle_store,
            task_store,
            verdict_store,
            clock,
            config,
            shutdown_tx,
            loop_handle: Arc::new(RwLock::new(None)),
        }
    }

    pub async fn stats(&self) -> ControllerStats {
        let cycle = self.current_cycle.read().await.clone();
        let parked = cycle.as_ref().is_some_and(|c| c.phase == CyclePhase::Closed)
            && self.cycle_store.is_paused().await.unwrap_or(false);
        ControllerStats {
            state: *self.state.read().await,
            cycle_id: cycle.as_ref().map(|c| c.id),
            phase: cycle.as_ref().map(|c| c.phase),
            cycles_completed: *self.cycles_completed.read().await,
            parked,
        }
    }

    /// Start the background phase-polling loop. Actual agent work (the
    /// Planner/Worker/Judge runtimes) is driven by the caller reacting
    /// to phase transitions; this loop only owns quiescence detection
    /// and cycle bookkeeping.
    pub async fn start(&self) -> DomainResult<()> {
        {
            let mut state = self.state.write().await;
            if *state != ControllerState::Stopped {
                return Ok(());
            }
            *state = ControllerState::Starting;
        }

        let cycle = self.open_or_resume_cycle().await?;
        *self.current_cycle.write().await = Some(cycle);
        *self.phase_entered_at.write().await = self.clock.now();

        let handle = self.spawn_phase_loop();
        *self.loop_handle.write().await = Some(handle);
        *self.state.write().await = ControllerState::Running;
        info!("cycle controller started");
        Ok(())
    }

    /// Graceful shutdown: signal the loop and wait up to 30s for it to
    /// notice and exit before giving up.
    pub async fn stop(&self) -> DomainResult<()> {
        {
            let mut state = self.state.write().await;
            if *state != ControllerState::Running {
                return Ok(());
            }
            *state = ControllerState::Stopping;
        }

        let _ = self.shutdown_tx.send(());

        if let Some(handle) = self.loop_handle.write().await.take() {
            match tokio::time::timeout(Duration::from_secs(30), handle).await {
                Ok(Ok(Ok(()))) => {}
                Ok(Ok(Err(e))) => error!(error = %e, "phase loop exited with error"),
                Ok(Err(e)) => error!(error = %e, "phase loop task panicked"),
                Err(_) => warn!("phase loop did not stop within 30s"),
            }
        }

        *self.state.write().await = ControllerState::Stopped;
        info!("cycle controller stopped");
        Ok(())
    }

    async fn open_or_resume_cycle(&self) -> DomainResult<Cycle> {
        if let Some(latest) = self.cycle_store.latest().await? {
            if !latest.is_closed() {
                return Ok(latest);
            }
            if self.cycle_store.is_paused().await? {
                return Ok(latest);
            }
            let cycle = Cycle::start(Uuid::new_v4(), latest.sequence + 1, self.clock.now());
            return self.cycle_store.create(cycle).await;
        }
        let cycle = Cycle::start(Uuid::new_v4(), 1, self.clock.now());
        self.cycle_store.create(cycle).await
    }

    /// Advance the active cycle out of `planning` once the caller's
    /// Planner runtimes have finished producing this round's tasks.
    /// A no-op if the cycle is not currently in `planning`.
    pub async fn mark_planning_complete(&self) -> DomainResult<()> {
        let mut guard = self.current_cycle.write().await;
        let Some(cycle) = guard.as_mut() else { return Ok(()) };
        if cycle.phase != CyclePhase::Planning {
            return Ok(());
        }
        cycle.phase = CyclePhase::Executing;
        cycle.version += 1;
        self.cycle_store.update(cycle).await?;
        *self.phase_entered_at.write().await = self.clock.now();
        Ok(())
    }

    fn spawn_phase_loop(&self) -> JoinHandle<DomainResult<()>> {
        let state = Arc::clone(&self.state);
        let current_cycle = Arc::clone(&self.current_cycle);
        let phase_entered_at = Arc::clone(&self.phase_entered_at);
        let cycles_completed = Arc::clone(&self.cycles_completed);
        let cycle_store = Arc::clone(&self.cycle_store);
        let task_store = Arc::clone(&self.task_store);
        let verdict_store = Arc::clone(&self.verdict_store);
        let clock = Arc::clone(&self.clock);
        let poll_ms = self.config.orchestrator.claim_poll_interval_ms;
        let carry_over = self.config.orchestrator.carry_over_pending_tasks;
        let planning_window = ChronoDuration::seconds(self.config.orchestrator.planning_window_secs as i64);
        let execution_window = ChronoDuration::seconds(self.config.orchestrator.execution_window_secs as i64);
        let judge_timeout = ChronoDuration::seconds(self.config.orchestrator.judge_timeout_secs as i64);
        let mut shutdown_rx = self.shutdown_tx.subscribe();

        tokio::spawn(async move {
            let mut poll_interval = interval(Duration::from_millis(poll_ms.max(50)));

            loop {
                tokio::select! {
                    _ = poll_interval.tick() => {
                        let Some(mut cycle) = current_cycle.read().await.clone() else { continue };
                        if cycle.phase == CyclePhase::Closed {
                            continue;
                        }

                        let now = clock.now();
                        let elapsed = now - *phase_entered_at.read().await;

                        match cycle.phase {
                            // Planning ends when the caller's Planner runtimes report
                            // done via `mark_planning_complete`, or when the hard
                            // planning window elapses regardless (P4).
                            CyclePhase::Planning => {
                                if elapsed >= planning_window {
                                    warn!(cycle_sequence = cycle.sequence, "planning window elapsed, forcing executing");
                                    cycle.phase = CyclePhase::Executing;
                                    cycle.version += 1;
                                    cycle_store.update(&cycle).await?;
                                    *current_cycle.write().await = Some(cycle);
                                    *phase_entered_at.write().await = now;
                                }
                            }
                            CyclePhase::Executing => {
                                let window_elapsed = elapsed >= execution_window;
                                if window_elapsed {
                                    warn!(cycle_sequence = cycle.sequence, "execution window elapsed, forcing judging with tasks still queued");
                                }
                                if window_elapsed || Self::quiescent(&task_store, cycle.id).await? {
                                    cycle.phase = CyclePhase::Judging;
                                    cycle.version += 1;
                                    cycle_store.update(&cycle).await?;
                                    *current_cycle.write().await = Some(cycle);
                                    *phase_entered_at.write().await = now;
                                }
                            }
                            CyclePhase::Judging => {
                                let mut verdict = verdict_store.get_for_cycle(cycle.id).await?;
                                let timed_out = elapsed >= judge_timeout && verdict.is_none();
                                if timed_out {
                                    warn!(cycle_sequence = cycle.sequence, "judge timeout elapsed, recording a synthetic pause verdict");
                                    let synthetic = Verdict {
                                        id: Uuid::new_v4(),
                                        cycle_id: cycle.id,
                                        judge_id: Uuid::nil(),
                                        decision: VerdictDecision::Pause,
                                        reviewed_count: 0,
                                        approved_count: 0,
                                        rejected_count: 0,
                                        metrics: serde_json::json!({}),
                                        reasoning: "judge did not produce a verdict within the judge timeout".to_string(),
                                        recorded_at: now,
                                    };
                                    verdict = Some(verdict_store.record(synthetic).await?);
                                }

                                if let Some(verdict) = verdict {
                                    let continuing = verdict.allows_continuation();
                                    let carried = if continuing {
                                        let next_id = Uuid::new_v4();
                                        let carried = Self::resolve_leftover_tasks(
                                            &task_store, cycle.id, next_id, carry_over, now,
                                        ).await?;
                                        cycle.tasks_carried_over = carried;
                                        cycle.close(now);
                                        cycle.version += 1;
                                        cycle_store.update(&cycle).await?;
                                        *cycles_completed.write().await += 1;

                                        let next = Cycle::start(next_id, cycle.sequence + 1, now);
                                        let next = cycle_store.create(next).await?;
                                        *current_cycle.write().await = Some(next);
                                        carried
                                    } else {
                                        Self::abandon_leftover_tasks(&task_store, cycle.id, now).await?;
                                        cycle.close(now);
                                        cycle.version += 1;
                                        cycle_store.update(&cycle).await?;
                                        *cycles_completed.write().await += 1;
                                        cycle_store.set_paused(true).await?;
                                        *current_cycle.write().await = Some(cycle.clone());
                                        warn!(cycle_sequence = cycle.sequence, decision = verdict.decision.as_str(), "cycle parked, awaiting an operator's resume");
                                        0
                                    };
                                    *phase_entered_at.write().await = now;
                                    info!(cycle_sequence = cycle.sequence, carried, decision = verdict.decision.as_str(), "cycle closed");
                                }
                            }
                            CyclePhase::Closed => {
                                if !cycle_store.is_paused().await? {
                                    let next = Cycle::start(Uuid::new_v4(), cycle.sequence + 1, now);
                                    let next = cycle_store.create(next).await?;
                                    info!(cycle_sequence = next.sequence, "resuming, new cycle opened");
                                    *current_cycle.write().await = Some(next);
                                    *phase_entered_at.write().await = now;
                                }
                            }
                        }
                    }
                    _ = shutdown_rx.recv() => {
                        info!("phase loop received shutdown signal");
                        break;
                    }
                }
            }

            Ok(())
        })
    }

    async fn quiescent(task_store: &Arc<dyn TaskStore>, cycle_id: Uuid) -> DomainResult<bool> {
        let counts = task_store.count_by_status(Some(cycle_id)).await?;
        let active: u64 = [TaskStatus::Pending, TaskStatus::Assigned, TaskStatus::Running]
            .iter()
            .map(|s| counts.get(s).copied().unwrap_or(0))
            .sum();
        Ok(active == 0)
    }

    /// A cycle whose verdict is `pause`/`halt` does not carry leftover
    /// tasks into a next cycle, because none is opened; any task still
    /// `pending` when the cycle closes this way is abandoned instead.
    async fn abandon_leftover_tasks(
        task_store: &Arc<dyn TaskStore>,
        cycle_id: Uuid,
        now: chrono::DateTime<chrono::Utc>,
    ) -> DomainResult<()> {
        let leftover = task_store
            .list(TaskFilter { status: Some(TaskStatus::Pending), cycle_id: Some(cycle_id), worker_id: None })
            .await?;
        for mut task in leftover {
            task.status = TaskStatus::Abandoned;
            task.updated_at = now;
            task_store.update(&task).await?;
        }
        Ok(())
    }

    /// Resolve any `pending` tasks still tagged to a closing cycle: roll
    /// them into the next cycle when carry-over is enabled, or abandon
    /// them otherwise. Returns the number carried over.
    async fn resolve_leftover_tasks(
        task_store: &Arc<dyn TaskStore>,
        closing_cycle_id: Uuid,
        next_cycle_id: Uuid,
        carry_over: bool,
        now: chrono::DateTime<chrono::Utc>,
    ) -> DomainResult<u64> {
        let leftover = task_store
            .list(TaskFilter { status: Some(TaskStatus::Pending), cycle_id: Some(closing_cycle_id), worker_id: None })
            .await?;

        let mut carried = 0u64;
        for mut task in leftover {
            task.updated_at = now;
            if carry_over {
                task.cycle_id = Some(next_cycle_id);
                carried += 1;
            } else {
                task.status = TaskStatus::Abandoned;
            }
            task_store.update(&task).await?;
        }
        Ok(carried)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::sqlite::{create_migrated_test_pool, SqliteCycleStore, SqliteTaskStore, SqliteVerdictStore};
    use crate::domain::ports::SystemClock;

    async fn controller() -> CycleController {
        let pool = create_migrated_test_pool().await.unwrap();
        CycleController::new(
            Arc::new(SqliteCycleStore::new(pool.clone())),
            Arc::new(SqliteTaskStore::new(pool.clone())),
            Arc::new(SqliteVerdictStore::new(pool)),
            Arc::new(SystemClock),
            Config::default(),
        )
    }

    #[tokio::test]
    async fn starts_a_cycle_in_planning() {
        let controller = controller().await;
        controller.start().await.unwrap();
        let stats = controller.stats().await;
        assert_eq!(stats.state, ControllerState::Running);
        assert_eq!(stats.phase, Some(CyclePhase::Planning));
        controller.stop().await.unwrap();
    }

    #[tokio::test]
    async fn stop_is_idempotent_when_not_running() {
        let controller = controller().await;
        controller.stop().await.unwrap();
        assert_eq!(controller.stats().await.state, ControllerState::Stopped);
    }

    #[tokio::test]
    async fn planning_window_elapsing_forces_executing_without_explicit_signal() {
        let pool = create_migrated_test_pool().await.unwrap();
        let mut config = Config::default();
        config.orchestrator.planning_window_secs = 0;
        config.orchestrator.claim_poll_interval_ms = 50;
        let controller = CycleController::new(
            Arc::new(SqliteCycleStore::new(pool.clone())),
            Arc::new(SqliteTaskStore::new(pool.clone())),
            Arc::new(SqliteVerdictStore::new(pool)),
            Arc::new(SystemClock),
            config,
        );

        controller.start().await.unwrap();
        // No `mark_planning_complete` call: the window alone must advance
        // the phase.
        tokio::time::sleep(std::time::Duration::from_millis(200)).await;
        assert_eq!(controller.stats().await.phase, Some(CyclePhase::Executing));
        controller.stop().await.unwrap();
    }

    #[tokio::test]
    async fn execution_window_elapsing_forces_judging_with_tasks_still_queued() {
        use crate::domain::models::{TaskComplexity, TaskDraft};

        let pool = create_migrated_test_pool().await.unwrap();
        let mut config = Config::default();
        config.orchestrator.execution_window_secs = 0;
        config.orchestrator.claim_poll_interval_ms = 50;
        let task_store = Arc::new(SqliteTaskStore::new(pool.clone()));
        let cycle_store = Arc::new(SqliteCycleStore::new(pool.clone()));
        let verdict_store = Arc::new(SqliteVerdictStore::new(pool));
        let controller =
            CycleController::new(cycle_store.clone(), task_store.clone(), verdict_store, Arc::new(SystemClock), config);

        controller.start().await.unwrap();
        let cycle_id = controller.stats().await.cycle_id.unwrap();
        task_store
            .create(TaskDraft {
                cycle_id: Some(cycle_id),
                title: "still queued".to_string(),
                description: "d".to_string(),
                affected_files: vec!["README.md".to_string()],
                acceptance_criteria: vec!["n/a".to_string()],
                priority: 5,
                complexity: TaskComplexity::Low,
                tags: vec![],
                deadline: None,
                creator_agent_id: Uuid::new_v4(),
                max_attempts: 3,
            })
            .await
            .unwrap();

        controller.mark_planning_complete().await.unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(200)).await;
        // A pending task remains, so only the window forcing the
        // transition explains ending up in judging here.
        assert_eq!(controller.stats().await.phase, Some(CyclePhase::Judging));
        controller.stop().await.unwrap();
    }

    #[tokio::test]
    async fn judge_timeout_parks_the_system_with_a_synthetic_pause_verdict() {
        let pool = create_migrated_test_pool().await.unwrap();
        let mut config = Config::default();
        config.orchestrator.planning_window_secs = 0;
        config.orchestrator.execution_window_secs = 0;
        config.orchestrator.judge_timeout_secs = 0;
        config.orchestrator.claim_poll_interval_ms = 50;
        let cycle_store = Arc::new(SqliteCycleStore::new(pool.clone()));
        let verdict_store = Arc::new(SqliteVerdictStore::new(pool.clone()));
        let controller = CycleController::new(
            cycle_store.clone(),
            Arc::new(SqliteTaskStore::new(pool)),
            verdict_store.clone(),
            Arc::new(SystemClock),
            config,
        );

        controller.start().await.unwrap();
        let cycle_id = controller.stats().await.cycle_id.unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(300)).await;

        let stats = controller.stats().await;
        assert_eq!(stats.phase, Some(CyclePhase::Closed));
        assert!(stats.parked);
        assert!(cycle_store.is_paused().await.unwrap());

        let verdict = verdict_store.get_for_cycle(cycle_id).await.unwrap().unwrap();
        assert_eq!(verdict.decision, VerdictDecision::Pause);
        controller.stop().await.unwrap();
    }

    #[tokio::test]
    async fn clearing_the_pause_flag_resumes_with_a_new_cycle() {
        let pool = create_migrated_test_pool().await.unwrap();
        let mut config = Config::default();
        config.orchestrator.planning_window_secs = 0;
        config.orchestrator.execution_window_secs = 0;
        config.orchestrator.judge_timeout_secs = 0;
        config.orchestrator.claim_poll_interval_ms = 50;
        let cycle_store = Arc::new(SqliteCycleStore::new(pool.clone()));
        let verdict_store = Arc::new(SqliteVerdictStore::new(pool.clone()));
        let controller = CycleController::new(
            cycle_store.clone(),
            Arc::new(SqliteTaskStore::new(pool)),
            verdict_store,
            Arc::new(SystemClock),
            config,
        );

        controller.start().await.unwrap();
        let first_cycle = controller.stats().await.cycle_id.unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(300)).await;
        assert!(controller.stats().await.parked);

        cycle_store.set_paused(false).await.unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(200)).await;

        let stats = controller.stats().await;
        assert!(!stats.parked);
        assert_ne!(stats.cycle_id, Some(first_cycle));
        assert_eq!(stats.phase, Some(CyclePhase::Planning));
        controller.stop().await.unwrap();
    }
}
