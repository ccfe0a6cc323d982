//! Verdict domain model: the Judge's once-per-cycle continuation decision.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The Judge's continuation decision for a closed cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerdictDecision {
    Continue,
    Pause,
    Halt,
}

impl VerdictDecision {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Continue => "continue",
            Self::Pause => "pause",
            Self::Halt => "halt",
        }
    }

    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "continue" => Some(Self::Continue),
            "pause" => Some(Self::Pause),
            "halt" => Some(Self::Halt),
            _ => None,
        }
    }
}

/// A Judge's single output for one closed cycle: a decision plus the
/// counts and metrics it was based on. A cycle carries at most one (C2).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Verdict {
    pub id: Uuid,
    pub cycle_id: Uuid,
    pub judge_id: Uuid,
    pub decision: VerdictDecision,
    pub reviewed_count: u32,
    pub approved_count: u32,
    pub rejected_count: u32,
    /// Opaque aggregate metric bag (test pass ratio, coverage delta, a
    /// code-quality index, ...) - the core does not interpret these.
    pub metrics: serde_json::Value,
    pub reasoning: String,
    pub recorded_at: DateTime<Utc>,
}

impl Verdict {
    /// Whether the approved/rejected counts the Judge reported are
    /// internally consistent with what it claims to have reviewed.
    pub fn counts_consistent(&self) -> bool {
        self.approved_count + self.rejected_count == self.reviewed_count
    }

    pub fn allows_continuation(&self) -> bool {
        self.decision == VerdictDecision::Continue
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Verdict {
        Verdict {
            id: Uuid::new_v4(),
            cycle_id: Uuid::new_v4(),
            judge_id: Uuid::new_v4(),
            decision: VerdictDecision::Continue,
            reviewed_count: 5,
            approved_count: 4,
            rejected_count: 1,
            metrics: serde_json::json!({"test_pass_ratio": 0.92}),
            reasoning: "most tasks landed cleanly".to_string(),
            recorded_at: Utc::now(),
        }
    }

    #[test]
    fn continue_decision_allows_continuation() {
        assert!(sample().allows_continuation());
    }

    #[test]
    fn pause_decision_blocks_continuation() {
        let mut v = sample();
        v.decision = VerdictDecision::Pause;
        assert!(!v.allows_continuation());
    }

    #[test]
    fn consistent_counts_detected() {
        assert!(sample().counts_consistent());
        let mut v = sample();
        v.rejected_count = 0;
        assert!(!v.counts_consistent());
    }
}
