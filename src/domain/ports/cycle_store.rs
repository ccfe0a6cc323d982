//! Cycle store port: persistence for Plan -> Execute -> Judge rounds.

use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::errors::DomainResult;
use crate::domain::models::Cycle;

/// Persistence interface for cycles.
#[async_trait]
pub trait CycleStore: Send + Sync {
    async fn create(&self, cycle: Cycle) -> DomainResult<Cycle>;

    async fn get(&self, id: Uuid) -> DomainResult<Option<Cycle>>;

    /// Persist a mutated cycle, enforcing optimistic-lock semantics.
    async fn update(&self, cycle: &Cycle) -> DomainResult<()>;

    /// The most recently started cycle, if any.
    async fn latest(&self) -> DomainResult<Option<Cycle>>;

    async fn list_recent(&self, limit: u32) -> DomainResult<Vec<Cycle>>;

    /// Whether the system is currently parked: a closed cycle will not
    /// be followed by a new one until this is cleared, either by an
    /// operator's `cycle open` or because it was never set.
    async fn is_paused(&self) -> DomainResult<bool>;

    /// Set or clear the park flag. Set automatically when a Judge
    /// verdict's decision is `pause` or `halt`; cleared by an
    /// operator's `cycle open`.
    async fn set_paused(&self, paused: bool) -> DomainResult<()>;
}
