//! Cycle domain model: one Plan -> Execute -> Judge round coordinated by
//! the `CycleController`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Phase of an in-progress cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CyclePhase {
    Planning,
    Executing,
    Judging,
    Closed,
}

impl CyclePhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Planning => "planning",
            Self::Executing => "executing",
            Self::Judging => "judging",
            Self::Closed => "closed",
        }
    }

    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "planning" => Some(Self::Planning),
            "executing" => Some(Self::Executing),
            "judging" => Some(Self::Judging),
            "closed" => Some(Self::Closed),
            _ => None,
        }
    }
}

/// A single Plan -> Execute -> Judge round.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Cycle {
    pub id: Uuid,
    pub sequence: u64,
    pub phase: CyclePhase,
    pub started_at: DateTime<Utc>,
    pub closed_at: Option<DateTime<Utc>>,
    pub tasks_completed: u64,
    pub tasks_abandoned: u64,
    pub tasks_carried_over: u64,
    pub version: u64,
}

impl Cycle {
    pub fn start(id: Uuid, sequence: u64, now: DateTime<Utc>) -> Self {
        Self {
            id,
            sequence,
            phase: CyclePhase::Planning,
            started_at: now,
            closed_at: None,
            tasks_completed: 0,
            tasks_abandoned: 0,
            tasks_carried_over: 0,
            version: 1,
        }
    }

    pub fn is_closed(&self) -> bool {
        self.phase == CyclePhase::Closed
    }

    pub fn close(&mut self, now: DateTime<Utc>) {
        self.phase = CyclePhase::Closed;
        self.closed_at = Some(now);
    }
}
