//! Version-control adapter port: the seam Worker runtimes use to manage
//! feature branches on the shared source-controlled codebase.

use async_trait::async_trait;

use crate::domain::errors::DomainResult;

/// Port for the minimal git operations a Worker needs to isolate its
/// work on a feature branch (I5: Workers never push or merge directly).
#[async_trait]
pub trait VcsAdapter: Send + Sync {
    /// Create and check out a new branch from the configured base branch.
    async fn create_branch(&self, branch_name: &str) -> DomainResult<()>;

    /// Stage all changes and commit with the given message, returning the
    /// new commit id.
    async fn commit_all(&self, branch_name: &str, message: &str) -> DomainResult<String>;

    /// Discard all uncommitted changes and delete a branch (used when a
    /// task is abandoned or revoked).
    async fn discard_branch(&self, branch_name: &str) -> DomainResult<()>;

    /// Whether a branch currently exists.
    async fn branch_exists(&self, branch_name: &str) -> DomainResult<bool>;

    /// Current HEAD commit id of the base branch.
    async fn base_commit(&self) -> DomainResult<String>;
}

#[cfg(test)]
mod tests {
    // Exercised via the git_cli adapter's own test module since this
    // trait carries no executable logic of its own.
}
