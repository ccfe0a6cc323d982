//! Domain error types for the conclave task lifecycle engine.

use thiserror::Error;
use uuid::Uuid;

/// Domain-level errors surfaced by ports and application services.
#[derive(Debug, Error)]
pub enum DomainError {
    #[error("task not found: {0}")]
    TaskNotFound(Uuid),

    #[error("agent not found: {0}")]
    AgentNotFound(Uuid),

    #[error("cycle not found: {0}")]
    CycleNotFound(Uuid),

    #[error("invalid state transition from {from} to {to}")]
    InvalidStateTransition { from: String, to: String },

    #[error("validation failed: {0}")]
    ValidationFailed(String),

    #[error("concurrency conflict: {entity} {id} was modified (expected version {expected}, found {found})")]
    StaleVersion {
        entity: String,
        id: String,
        expected: u64,
        found: u64,
    },

    #[error("task {0} is bound to a different worker")]
    WorkerMismatch(Uuid),

    #[error("path escapes repository root: {0}")]
    SandboxViolation(String),

    #[error("database error: {0}")]
    Database(String),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("adapter error: {0}")]
    Adapter(String),
}

pub type DomainResult<T> = Result<T, DomainError>;

impl From<sqlx::Error> for DomainError {
    fn from(err: sqlx::Error) -> Self {
        DomainError::Database(err.to_string())
    }
}

impl From<serde_json::Error> for DomainError {
    fn from(err: serde_json::Error) -> Self {
        DomainError::Serialization(err.to_string())
    }
}
