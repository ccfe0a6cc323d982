//! Hierarchical configuration loading for a conclave instance.

use figment::providers::{Env, Format, Serialized, Yaml};
use figment::Figment;
use thiserror::Error;

use crate::domain::models::Config;

/// Configuration validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("figment extraction failed: {0}")]
    Extraction(#[from] figment::Error),

    #[error("invalid max_concurrent_workers: {0}. Must be between 1 and 256")]
    InvalidMaxConcurrentWorkers(usize),

    #[error("invalid planner_count: {0}. Must be at least 1")]
    InvalidPlannerCount(usize),

    #[error("invalid judge_count: {0}. Must be at least 1")]
    InvalidJudgeCount(usize),

    #[error("invalid max_attempts_per_task: {0}. Must be at least 1")]
    InvalidMaxAttempts(u32),

    #[error("invalid log level: {0}. Must be one of: trace, debug, info, warn, error")]
    InvalidLogLevel(String),

    #[error("database path must not be empty")]
    EmptyDatabasePath,

    #[error("invalid max_connections: {0}. Must be at least 1")]
    InvalidMaxConnections(u32),

    #[error("invalid requests_per_minute: {0}. Must be at least 1")]
    InvalidRequestsPerMinute(u32),

    #[error("invalid max_retries: {0}. Must be at least 1")]
    InvalidMaxRetries(u32),

    #[error("repository root must not be empty")]
    EmptyRepositoryRoot,
}

/// Configuration loader with hierarchical merging.
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration with hierarchical merging.
    ///
    /// Precedence (lowest to highest):
    /// 1. Programmatic defaults
    /// 2. `.conclave/config.yaml` (project config)
    /// 3. `.conclave/local.yaml` (optional local overrides)
    /// 4. `CONCLAVE_*` environment variables (highest priority)
    pub fn load() -> Result<Config, ConfigError> {
        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Yaml::file(".conclave/config.yaml"))
            .merge(Yaml::file(".conclave/local.yaml"))
            .merge(Env::prefixed("CONCLAVE_").split("__"))
            .extract()?;

        Self::validate(&config)?;
        Ok(config)
    }

    /// Load configuration from a specific file, skipping the project
    /// discovery layers (used by the CLI's `--config` flag).
    pub fn load_from_file(path: impl AsRef<std::path::Path>) -> Result<Config, ConfigError> {
        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Yaml::file(path.as_ref()))
            .merge(Env::prefixed("CONCLAVE_").split("__"))
            .extract()?;

        Self::validate(&config)?;
        Ok(config)
    }

    /// Validate a loaded configuration's invariants.
    pub fn validate(config: &Config) -> Result<(), ConfigError> {
        let orch = &config.orchestrator;
        if orch.max_concurrent_workers == 0 || orch.max_concurrent_workers > 256 {
            return Err(ConfigError::InvalidMaxConcurrentWorkers(orch.max_concurrent_workers));
        }
        if orch.planner_count == 0 {
            return Err(ConfigError::InvalidPlannerCount(orch.planner_count));
        }
        if orch.judge_count == 0 {
            return Err(ConfigError::InvalidJudgeCount(orch.judge_count));
        }
        if orch.max_attempts_per_task == 0 {
            return Err(ConfigError::InvalidMaxAttempts(orch.max_attempts_per_task));
        }

        let valid_log_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_log_levels.contains(&config.logging.level.as_str()) {
            return Err(ConfigError::InvalidLogLevel(config.logging.level.clone()));
        }

        if config.database.path.as_os_str().is_empty() {
            return Err(ConfigError::EmptyDatabasePath);
        }
        if config.database.max_connections == 0 {
            return Err(ConfigError::InvalidMaxConnections(config.database.max_connections));
        }

        if config.model.requests_per_minute == 0 {
            return Err(ConfigError::InvalidRequestsPerMinute(config.model.requests_per_minute));
        }
        if config.model.max_retries == 0 {
            return Err(ConfigError::InvalidMaxRetries(config.model.max_retries));
        }

        if config.repository.root.as_os_str().is_empty() {
            return Err(ConfigError::EmptyRepositoryRoot);
        }

        Ok(())
    }
}
