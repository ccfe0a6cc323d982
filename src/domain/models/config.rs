//! Root configuration model, loaded hierarchically by
//! [`crate::infrastructure::config::ConfigLoader`].

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Top-level configuration for a conclave instance.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub database: DatabaseConfig,
    pub logging: LogConfig,
    pub orchestrator: OrchestratorConfig,
    pub model: ModelConfig,
    pub repository: RepositoryConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database: DatabaseConfig::default(),
            logging: LogConfig::default(),
            orchestrator: OrchestratorConfig::default(),
            model: ModelConfig::default(),
            repository: RepositoryConfig::default(),
        }
    }
}

/// SQLite connection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub path: PathBuf,
    pub max_connections: u32,
    pub busy_timeout_ms: u64,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("conclave.db"),
            max_connections: 8,
            busy_timeout_ms: 5_000,
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Json,
    Pretty,
}

/// Log file rotation policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RotationPolicy {
    Daily,
    Hourly,
    Never,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    pub level: String,
    pub format: LogFormat,
    pub log_dir: Option<PathBuf>,
    pub enable_stdout: bool,
    pub rotation: RotationPolicy,
    pub retention_days: u32,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Pretty,
            log_dir: None,
            enable_stdout: true,
            rotation: RotationPolicy::Daily,
            retention_days: 30,
        }
    }
}

/// Orchestrator concurrency and lifecycle tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OrchestratorConfig {
    pub max_concurrent_workers: usize,
    pub planner_count: usize,
    pub judge_count: usize,
    pub max_attempts_per_task: u32,
    pub agent_error_ceiling: u32,
    pub heartbeat_interval_secs: u64,
    pub stall_timeout_secs: u64,
    pub claim_poll_interval_ms: u64,
    pub carry_over_pending_tasks: bool,
    /// Hard upper bound on the planning phase; elapsing forces the
    /// transition to executing even without an explicit signal that
    /// planning finished.
    pub planning_window_secs: u64,
    /// Hard upper bound on the executing phase; elapsing advances to
    /// judging even if tasks remain in the queue (P4, S5).
    pub execution_window_secs: u64,
    /// Max wait for judge verdicts on a cycle's reviewed tasks before the
    /// cycle closes on a timeout rather than waiting indefinitely (S6).
    pub judge_timeout_secs: u64,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            max_concurrent_workers: 4,
            planner_count: 1,
            judge_count: 1,
            max_attempts_per_task: 3,
            agent_error_ceiling: 3,
            planning_window_secs: 300,
            execution_window_secs: 1800,
            judge_timeout_secs: 120,
            heartbeat_interval_secs: 10,
            stall_timeout_secs: 120,
            claim_poll_interval_ms: 250,
            carry_over_pending_tasks: true,
        }
    }
}

/// Model-inference adapter configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    pub endpoint: String,
    pub api_key_env: String,
    pub max_concurrent_requests: u32,
    pub requests_per_minute: u32,
    pub request_timeout_secs: u64,
    pub max_retries: u32,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://api.anthropic.com/v1/messages".to_string(),
            api_key_env: "ANTHROPIC_API_KEY".to_string(),
            max_concurrent_requests: 4,
            requests_per_minute: 50,
            request_timeout_secs: 120,
            max_retries: 3,
        }
    }
}

/// Source-controlled repository root and worktree layout.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RepositoryConfig {
    pub root: PathBuf,
    pub base_branch: String,
    pub worktree_dir: PathBuf,
}

impl Default for RepositoryConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("."),
            base_branch: "main".to_string(),
            worktree_dir: PathBuf::from(".conclave/worktrees"),
        }
    }
}

impl Default for LogFormat {
    fn default() -> Self {
        Self::Pretty
    }
}

impl Default for RotationPolicy {
    fn default() -> Self {
        Self::Daily
    }
}
