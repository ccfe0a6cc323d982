//! Filesystem and process-execution adapter port: the sandboxed surface
//! Worker runtimes use to read/write the codebase and run commands.

use async_trait::async_trait;
use std::path::Path;

use crate::domain::errors::DomainResult;

/// Result of running a shell command inside the sandbox.
#[derive(Debug, Clone)]
pub struct ExecOutput {
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
}

impl ExecOutput {
    pub fn succeeded(&self) -> bool {
        self.exit_code == 0
    }
}

/// Port for sandboxed file and process access, scoped to a single
/// worktree root (I5: operations outside the root are rejected).
#[async_trait]
pub trait FsExecAdapter: Send + Sync {
    /// Read a UTF-8 text file relative to the sandbox root.
    async fn read_file(&self, path: &Path) -> DomainResult<String>;

    /// Write a UTF-8 text file relative to the sandbox root, creating
    /// parent directories as needed.
    async fn write_file(&self, path: &Path, contents: &str) -> DomainResult<()>;

    /// List entries of a directory relative to the sandbox root.
    async fn list_dir(&self, path: &Path) -> DomainResult<Vec<String>>;

    /// Run a command with the sandbox root as its working directory.
    async fn exec(&self, command: &str, args: &[String], timeout_secs: u64) -> DomainResult<ExecOutput>;
}
