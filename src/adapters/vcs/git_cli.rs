//! Git CLI adapter: shells out to the system `git` binary to manage
//! per-task feature branches.

use async_trait::async_trait;
use std::path::PathBuf;
use tokio::process::Command;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::ports::VcsAdapter;

pub struct GitCliAdapter {
    repo_root: PathBuf,
    base_branch: String,
}

impl GitCliAdapter {
    pub fn new(repo_root: impl Into<PathBuf>, base_branch: impl Into<String>) -> Self {
        Self { repo_root: repo_root.into(), base_branch: base_branch.into() }
    }

    async fn run(&self, args: &[&str]) -> DomainResult<String> {
        let output = Command::new("git")
            .args(args)
            .current_dir(&self.repo_root)
            .output()
            .await
            .map_err(|e| DomainError::Adapter(format!("failed to spawn git {args:?}: {e}")))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(DomainError::Adapter(format!("git {args:?} failed: {stderr}")));
        }

        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }
}

#[async_trait]
impl VcsAdapter for GitCliAdapter {
    async fn create_branch(&self, branch_name: &str) -> DomainResult<()> {
        self.run(&["checkout", &self.base_branch]).await?;
        self.run(&["checkout", "-b", branch_name]).await?;
        Ok(())
    }

    async fn commit_all(&self, branch_name: &str, message: &str) -> DomainResult<String> {
        self.run(&["checkout", branch_name]).await?;
        self.run(&["add", "-A"]).await?;
        self.run(&["commit", "-m", message, "--allow-empty"]).await?;
        self.run(&["rev-parse", "HEAD"]).await
    }

    async fn discard_branch(&self, branch_name: &str) -> DomainResult<()> {
        self.run(&["checkout", &self.base_branch]).await?;
        self.run(&["branch", "-D", branch_name]).await?;
        Ok(())
    }

    async fn branch_exists(&self, branch_name: &str) -> DomainResult<bool> {
        let output = Command::new("git")
            .args(["rev-parse", "--verify", branch_name])
            .current_dir(&self.repo_root)
            .output()
            .await
            .map_err(|e| DomainError::Adapter(format!("failed to spawn git rev-parse: {e}")))?;

        Ok(output.status.success())
    }

    async fn base_commit(&self) -> DomainResult<String> {
        self.run(&["rev-parse", self.base_branch.as_str()]).await
    }
}
