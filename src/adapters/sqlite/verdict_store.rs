//! SQLite implementation of the `VerdictStore` port.

use async_trait::async_trait;
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{Verdict, VerdictDecision};
use crate::domain::ports::VerdictStore;

#[derive(Clone)]
pub struct SqliteVerdictStore {
    pool: SqlitePool,
}

impl SqliteVerdictStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl VerdictStore for SqliteVerdictStore {
    async fn record(&self, verdict: Verdict) -> DomainResult<Verdict> {
        let metrics_json = serde_json::to_string(&verdict.metrics)?;

        sqlx::query(
            r#"INSERT INTO verdicts (id, cycle_id, judge_id, decision, reviewed_count, approved_count,
               rejected_count, metrics, reasoning, recorded_at)
               VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"#,
        )
        .bind(verdict.id.to_string())
        .bind(verdict.cycle_id.to_string())
        .bind(verdict.judge_id.to_string())
        .bind(verdict.decision.as_str())
        .bind(i64::from(verdict.reviewed_count))
        .bind(i64::from(verdict.approved_count))
        .bind(i64::from(verdict.rejected_count))
        .bind(&metrics_json)
        .bind(&verdict.reasoning)
        .bind(verdict.recorded_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(verdict)
    }

    async fn get_for_cycle(&self, cycle_id: Uuid) -> DomainResult<Option<Verdict>> {
        let row: Option<VerdictRow> = sqlx::query_as("SELECT * FROM verdicts WHERE cycle_id = ?")
            .bind(cycle_id.to_string())
            .fetch_optional(&self.pool)
            .await?;

        row.map(TryInto::try_into).transpose()
    }

    async fn list_recent(&self, limit: u32) -> DomainResult<Vec<Verdict>> {
        let rows: Vec<VerdictRow> = sqlx::query_as("SELECT * FROM verdicts ORDER BY recorded_at DESC LIMIT ?")
            .bind(i64::from(limit))
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter().map(TryInto::try_into).collect()
    }
}

#[derive(sqlx::FromRow)]
struct VerdictRow {
    id: String,
    cycle_id: String,
    judge_id: String,
    decision: String,
    reviewed_count: i64,
    approved_count: i64,
    rejected_count: i64,
    metrics: String,
    reasoning: String,
    recorded_at: String,
}

impl TryFrom<VerdictRow> for Verdict {
    type Error = DomainError;

    fn try_from(row: VerdictRow) -> Result<Self, Self::Error> {
        let decision = VerdictDecision::from_str(&row.decision)
            .ok_or_else(|| DomainError::Serialization(format!("invalid verdict decision: {}", row.decision)))?;

        Ok(Verdict {
            id: super::parse_uuid(&row.id)?,
            cycle_id: super::parse_uuid(&row.cycle_id)?,
            judge_id: super::parse_uuid(&row.judge_id)?,
            decision,
            reviewed_count: row.reviewed_count as u32,
            approved_count: row.approved_count as u32,
            rejected_count: row.rejected_count as u32,
            metrics: serde_json::from_str(&row.metrics)?,
            reasoning: row.reasoning,
            recorded_at: super::parse_datetime(&row.recorded_at)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::sqlite::create_migrated_test_pool;

    async fn setup_store() -> SqliteVerdictStore {
        let pool = create_migrated_test_pool().await.unwrap();
        SqliteVerdictStore::new(pool)
    }

    fn sample(cycle_id: Uuid) -> Verdict {
        Verdict {
            id: Uuid::new_v4(),
            cycle_id,
            judge_id: Uuid::new_v4(),
            decision: VerdictDecision::Continue,
            reviewed_count: 3,
            approved_count: 3,
            rejected_count: 0,
            metrics: serde_json::json!({"test_pass_ratio": 1.0}),
            reasoning: "all reviewed tasks landed".to_string(),
            recorded_at: chrono::Utc::now(),
        }
    }

    #[tokio::test]
    async fn record_and_get_for_cycle_round_trip() {
        let store = setup_store().await;
        let cycle_id = Uuid::new_v4();
        store.record(sample(cycle_id)).await.unwrap();

        let verdict = store.get_for_cycle(cycle_id).await.unwrap().unwrap();
        assert!(verdict.allows_continuation());
        assert_eq!(verdict.reviewed_count, 3);
    }

    #[tokio::test]
    async fn unjudged_cycle_has_no_verdict() {
        let store = setup_store().await;
        assert!(store.get_for_cycle(Uuid::new_v4()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn list_recent_orders_newest_first() {
        let store = setup_store().await;
        let older = sample(Uuid::new_v4());
        let mut newer = sample(Uuid::new_v4());
        newer.recorded_at = older.recorded_at + chrono::Duration::seconds(5);
        store.record(older).await.unwrap();
        store.record(newer.clone()).await.unwrap();

        let recent = store.list_recent(10).await.unwrap();
        assert_eq!(recent[0].id, newer.id);
    }
}
