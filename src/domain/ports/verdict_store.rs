//! Verdict store port: append-only log of Judge decisions, at most one per cycle (C2).

use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::errors::DomainResult;
use crate::domain::models::Verdict;

/// Persistence interface for verdicts. Verdicts are never updated once
/// recorded, only appended.
#[async_trait]
pub trait VerdictStore: Send + Sync {
    async fn record(&self, verdict: Verdict) -> DomainResult<Verdict>;

    /// The verdict recorded for a cycle, if the Judge has written one yet.
    async fn get_for_cycle(&self, cycle_id: Uuid) -> DomainResult<Option<Verdict>>;

    async fn list_recent(&self, limit: u32) -> DomainResult<Vec<Verdict>>;
}
