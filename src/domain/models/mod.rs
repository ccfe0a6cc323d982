//! Domain models: the plain-data types shared across ports and application
//! runtimes.

pub mod agent;
pub mod config;
pub mod cycle;
pub mod task;
pub mod verdict;

pub use agent::{Agent, AgentRole, AgentStatus};
pub use config::{
    Config, DatabaseConfig, LogConfig, LogFormat, ModelConfig, OrchestratorConfig, RepositoryConfig, RotationPolicy,
};
pub use cycle::{Cycle, CyclePhase};
pub use task::{AttemptDiagnostic, Task, TaskComplexity, TaskDraft, TaskStatus};
pub use verdict::{Verdict, VerdictDecision};
