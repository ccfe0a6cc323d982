//! Application layer: the runtimes that drive ports to enact the
//! Plan -> Execute -> Judge cycle.

pub mod agent_supervisor;
pub mod cycle_controller;
pub mod judge_runtime;
pub mod planner_runtime;
pub mod stall_monitor;
pub mod swarm;
pub mod validation;
pub mod worker_runtime;

pub use agent_supervisor::AgentSupervisor;
pub use cycle_controller::{ControllerState, ControllerStats, CycleController};
pub use judge_runtime::JudgeRuntime;
pub use planner_runtime::PlannerRuntime;
pub use stall_monitor::StallMonitor;
pub use swarm::Swarm;
pub use worker_runtime::WorkerRuntime;
