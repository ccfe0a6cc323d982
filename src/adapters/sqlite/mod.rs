//! SQLite adapters for the task store, agent roster, cycle ledger, and
//! verdict log.

pub mod agent_store;
pub mod connection;
pub mod cycle_store;
pub mod migrations;
pub mod task_store;
pub mod verdict_store;

pub use agent_store::SqliteAgentStore;
pub use connection::{create_pool, create_test_pool, verify_connection, ConnectionError, PoolConfig};
pub use cycle_store::SqliteCycleStore;
pub use migrations::{all_embedded_migrations, Migration, MigrationError, Migrator};
pub use task_store::SqliteTaskStore;
pub use verdict_store::SqliteVerdictStore;

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::domain::errors::{DomainError, DomainResult};

/// Parse a UUID string from a SQLite row field.
pub fn parse_uuid(s: &str) -> DomainResult<Uuid> {
    Uuid::parse_str(s).map_err(|e| DomainError::Serialization(e.to_string()))
}

/// Parse an optional UUID string from a SQLite row field.
pub fn parse_optional_uuid(s: Option<String>) -> DomainResult<Option<Uuid>> {
    s.map(|s| Uuid::parse_str(&s)).transpose().map_err(|e| DomainError::Serialization(e.to_string()))
}

/// Parse an RFC3339 datetime string from a SQLite row field.
pub fn parse_datetime(s: &str) -> DomainResult<DateTime<Utc>> {
    chrono::DateTime::parse_from_rfc3339(s)
        .map_err(|e| DomainError::Serialization(e.to_string()))
        .map(|dt| dt.with_timezone(&Utc))
}

/// Parse an optional RFC3339 datetime string from a SQLite row field.
pub fn parse_optional_datetime(s: Option<String>) -> DomainResult<Option<DateTime<Utc>>> {
    s.map(|s| chrono::DateTime::parse_from_rfc3339(&s).map(|d| d.with_timezone(&Utc)))
        .transpose()
        .map_err(|e| DomainError::Serialization(e.to_string()))
}

/// Parse a JSON string from a SQLite row field, falling back to the type's default.
pub fn parse_json_or_default<T: serde::de::DeserializeOwned + Default>(s: Option<String>) -> DomainResult<T> {
    s.map(|s| serde_json::from_str(&s))
        .transpose()
        .map_err(|e| DomainError::Serialization(e.to_string()))
        .map(|opt| opt.unwrap_or_default())
}

#[derive(Debug, thiserror::Error)]
pub enum DatabaseError {
    #[error("connection error: {0}")]
    Connection(#[from] ConnectionError),
    #[error("migration error: {0}")]
    Migration(#[from] MigrationError),
    #[error("query error: {0}")]
    Query(#[from] sqlx::Error),
}

pub async fn initialize_database(database_url: &str) -> Result<SqlitePool, DatabaseError> {
    let pool = create_pool(database_url, None).await?;
    let migrator = Migrator::new(pool.clone());
    migrator.run_embedded_migrations(all_embedded_migrations()).await?;
    Ok(pool)
}

/// Create an in-memory test pool with all migrations applied.
pub async fn create_migrated_test_pool() -> Result<SqlitePool, DatabaseError> {
    let pool = create_test_pool().await?;
    let migrator = Migrator::new(pool.clone());
    migrator.run_embedded_migrations(all_embedded_migrations()).await?;
    Ok(pool)
}
