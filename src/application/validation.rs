//! Validation helpers shared by the agent runtimes.
//!
//! Agents are untrusted input sources (model output parsed as structured
//! data); everything that crosses from a model response into the domain
//! passes through here first.

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{TaskDraft, Verdict};

/// Validate a Planner-supplied draft before it is persisted as a task.
pub fn validate_task_draft(draft: &TaskDraft) -> DomainResult<()> {
    if draft.title.trim().is_empty() {
        return Err(DomainError::ValidationFailed("task title must not be empty".to_string()));
    }
    if draft.description.trim().is_empty() {
        return Err(DomainError::ValidationFailed(
            "task description must not be empty".to_string(),
        ));
    }
    if draft.acceptance_criteria.is_empty() {
        return Err(DomainError::ValidationFailed(
            "task must carry at least one acceptance criterion".to_string(),
        ));
    }
    if draft.priority > 10 {
        return Err(DomainError::ValidationFailed(format!(
            "priority {} out of range 0-10",
            draft.priority
        )));
    }
    if draft.max_attempts == 0 {
        return Err(DomainError::ValidationFailed(
            "max_attempts must be at least 1".to_string(),
        ));
    }
    Ok(())
}

/// Validate a Judge-produced verdict before it is recorded.
pub fn validate_verdict(verdict: &Verdict) -> DomainResult<()> {
    if verdict.reasoning.trim().is_empty() {
        return Err(DomainError::ValidationFailed(
            "verdict reasoning must not be empty".to_string(),
        ));
    }
    if !verdict.counts_consistent() {
        return Err(DomainError::ValidationFailed(format!(
            "verdict counts inconsistent: approved {} + rejected {} != reviewed {}",
            verdict.approved_count, verdict.rejected_count, verdict.reviewed_count
        )));
    }
    Ok(())
}
