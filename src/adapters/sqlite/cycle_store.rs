//! SQLite implementation of the `CycleStore` port.

use async_trait::async_trait;
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{Cycle, CyclePhase};
use crate::domain::ports::CycleStore;

#[derive(Clone)]
pub struct SqliteCycleStore {
    pool: SqlitePool,
}

impl SqliteCycleStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CycleStore for SqliteCycleStore {
    async fn create(&self, cycle: Cycle) -> DomainResult<Cycle> {
        sqlx::query(
            r#"INSERT INTO cycles (id, sequence, phase, started_at, closed_at, tasks_completed,
               tasks_abandoned, tasks_carried_over, version)
               VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)"#,
        )
        .bind(cycle.id.to_string())
        .bind(cycle.sequence as i64)
        .bind(cycle.phase.as_str())
        .bind(cycle.started_at.to_rfc3339())
        .bind(cycle.closed_at.map(|d| d.to_rfc3339()))
        .bind(cycle.tasks_completed as i64)
        .bind(cycle.tasks_abandoned as i64)
        .bind(cycle.tasks_carried_over as i64)
        .bind(cycle.version as i64)
        .execute(&self.pool)
        .await?;

        Ok(cycle)
    }

    async fn get(&self, id: Uuid) -> DomainResult<Option<Cycle>> {
        let row: Option<CycleRow> = sqlx::query_as("SELECT * FROM cycles WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await?;

        row.map(TryInto::try_into).transpose()
    }

    async fn update(&self, cycle: &Cycle) -> DomainResult<()> {
        let next_version = cycle.version + 1;
        let result = sqlx::query(
            r#"UPDATE cycles SET phase = ?, closed_at = ?, tasks_completed = ?,
               tasks_abandoned = ?, tasks_carried_over = ?, version = ?
               WHERE id = ? AND version = ?"#,
        )
        .bind(cycle.phase.as_str())
        .bind(cycle.closed_at.map(|d| d.to_rfc3339()))
        .bind(cycle.tasks_completed as i64)
        .bind(cycle.tasks_abandoned as i64)
        .bind(cycle.tasks_carried_over as i64)
        .bind(next_version as i64)
        .bind(cycle.id.to_string())
        .bind(cycle.version as i64)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return match self.get(cycle.id).await? {
                Some(current) => Err(DomainError::StaleVersion {
                    entity: "cycle".to_string(),
                    id: cycle.id.to_string(),
                    expected: cycle.version,
                    found: current.version,
                }),
                None => Err(DomainError::CycleNotFound(cycle.id)),
            };
        }

        Ok(())
    }

    async fn latest(&self) -> DomainResult<Option<Cycle>> {
        let row: Option<CycleRow> =
            sqlx::query_as("SELECT * FROM cycles ORDER BY sequence DESC LIMIT 1").fetch_optional(&self.pool).await?;

        row.map(TryInto::try_into).transpose()
    }

    async fn list_recent(&self, limit: u32) -> DomainResult<Vec<Cycle>> {
        let rows: Vec<CycleRow> = sqlx::query_as("SELECT * FROM cycles ORDER BY sequence DESC LIMIT ?")
            .bind(i64::from(limit))
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter().map(TryInto::try_into).collect()
    }

    async fn is_paused(&self) -> DomainResult<bool> {
        let paused: i64 = sqlx::query_scalar("SELECT paused FROM system_state WHERE id = 1")
            .fetch_one(&self.pool)
            .await?;
        Ok(paused != 0)
    }

    async fn set_paused(&self, paused: bool) -> DomainResult<()> {
        sqlx::query("UPDATE system_state SET paused = ? WHERE id = 1")
            .bind(paused as i64)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

#[derive(sqlx::FromRow)]
struct CycleRow {
    id: String,
    sequence: i64,
    phase: String,
    started_at: String,
    closed_at: Option<String>,
    tasks_completed: i64,
    tasks_abandoned: i64,
    tasks_carried_over: i64,
    version: i64,
}

impl TryFrom<CycleRow> for Cycle {
    type Error = DomainError;

    fn try_from(row: CycleRow) -> Result<Self, Self::Error> {
        let phase = CyclePhase::from_str(&row.phase)
            .ok_or_else(|| DomainError::Serialization(format!("invalid cycle phase: {}", row.phase)))?;

        Ok(Cycle {
            id: super::parse_uuid(&row.id)?,
            sequence: row.sequence as u64,
            phase,
            started_at: super::parse_datetime(&row.started_at)?,
            closed_at: super::parse_optional_datetime(row.closed_at)?,
            tasks_completed: row.tasks_completed as u64,
            tasks_abandoned: row.tasks_abandoned as u64,
            tasks_carried_over: row.tasks_carried_over as u64,
            version: row.version as u64,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::sqlite::create_migrated_test_pool;

    async fn setup_store() -> SqliteCycleStore {
        let pool = create_migrated_test_pool().await.unwrap();
        SqliteCycleStore::new(pool)
    }

    #[tokio::test]
    async fn create_and_latest_round_trip() {
        let store = setup_store().await;
        let cycle = Cycle::start(Uuid::new_v4(), 1, chrono::Utc::now());
        store.create(cycle.clone()).await.unwrap();

        let latest = store.latest().await.unwrap().unwrap();
        assert_eq!(latest.id, cycle.id);
        assert_eq!(latest.phase, CyclePhase::Planning);
    }

    #[tokio::test]
    async fn update_advances_phase() {
        let store = setup_store().await;
        let mut cycle = Cycle::start(Uuid::new_v4(), 1, chrono::Utc::now());
        store.create(cycle.clone()).await.unwrap();

        cycle.phase = CyclePhase::Executing;
        store.update(&cycle).await.unwrap();

        let fetched = store.get(cycle.id).await.unwrap().unwrap();
        assert_eq!(fetched.phase, CyclePhase::Executing);
        assert_eq!(fetched.version, 2);
    }

    #[tokio::test]
    async fn starts_unpaused_and_toggles() {
        let store = setup_store().await;
        assert!(!store.is_paused().await.unwrap());

        store.set_paused(true).await.unwrap();
        assert!(store.is_paused().await.unwrap());

        store.set_paused(false).await.unwrap();
        assert!(!store.is_paused().await.unwrap());
    }
}
