//! Sandboxed filesystem/exec adapter: confines every operation to a
//! single worktree root via canonicalized path prefix checks (I5).

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::process::Command;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::ports::{ExecOutput, FsExecAdapter};

pub struct SandboxedFsExec {
    root: PathBuf,
}

impl SandboxedFsExec {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Resolve `path` against the sandbox root and reject anything that
    /// escapes it.
    fn resolve(&self, path: &Path) -> DomainResult<PathBuf> {
        if path.is_absolute() {
            return Err(DomainError::SandboxViolation(path.display().to_string()));
        }

        let candidate = self.root.join(path);
        let normalized = normalize(&candidate);

        if !normalized.starts_with(&self.root) {
            return Err(DomainError::SandboxViolation(path.display().to_string()));
        }

        Ok(normalized)
    }
}

/// Lexically normalize `.`/`..` components without touching the
/// filesystem, since the target file may not exist yet (e.g. a write).
fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            std::path::Component::ParentDir => {
                out.pop();
            }
            std::path::Component::CurDir => {}
            other => out.push(other.as_os_str()),
        }
    }
    out
}

#[async_trait]
impl FsExecAdapter for SandboxedFsExec {
    async fn read_file(&self, path: &Path) -> DomainResult<String> {
        let resolved = self.resolve(path)?;
        tokio::fs::read_to_string(&resolved)
            .await
            .map_err(|e| DomainError::Adapter(format!("read {}: {e}", path.display())))
    }

    async fn write_file(&self, path: &Path, contents: &str) -> DomainResult<()> {
        let resolved = self.resolve(path)?;
        if let Some(parent) = resolved.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| DomainError::Adapter(format!("mkdir {}: {e}", parent.display())))?;
        }
        tokio::fs::write(&resolved, contents)
            .await
            .map_err(|e| DomainError::Adapter(format!("write {}: {e}", path.display())))
    }

    async fn list_dir(&self, path: &Path) -> DomainResult<Vec<String>> {
        let resolved = self.resolve(path)?;
        let mut entries = tokio::fs::read_dir(&resolved)
            .await
            .map_err(|e| DomainError::Adapter(format!("readdir {}: {e}", path.display())))?;

        let mut names = Vec::new();
        while let Some(entry) =
            entries.next_entry().await.map_err(|e| DomainError::Adapter(e.to_string()))?
        {
            names.push(entry.file_name().to_string_lossy().into_owned());
        }
        names.sort();
        Ok(names)
    }

    async fn exec(&self, command: &str, args: &[String], timeout_secs: u64) -> DomainResult<ExecOutput> {
        let mut cmd = Command::new(command);
        cmd.args(args).current_dir(&self.root);

        let output = tokio::time::timeout(std::time::Duration::from_secs(timeout_secs), cmd.output())
            .await
            .map_err(|_| DomainError::Adapter(format!("command timed out after {timeout_secs}s")))?
            .map_err(|e| DomainError::Adapter(format!("failed to spawn {command}: {e}")))?;

        Ok(ExecOutput {
            exit_code: output.status.code().unwrap_or(-1),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_absolute_paths() {
        let sandbox = SandboxedFsExec::new("/tmp/conclave-sandbox-test");
        let err = sandbox.resolve(Path::new("/etc/passwd")).unwrap_err();
        assert!(matches!(err, DomainError::SandboxViolation(_)));
    }

    #[test]
    fn rejects_parent_dir_escape() {
        let sandbox = SandboxedFsExec::new("/tmp/conclave-sandbox-test");
        let err = sandbox.resolve(Path::new("../../etc/passwd")).unwrap_err();
        assert!(matches!(err, DomainError::SandboxViolation(_)));
    }

    #[test]
    fn allows_nested_relative_paths() {
        let sandbox = SandboxedFsExec::new("/tmp/conclave-sandbox-test");
        let resolved = sandbox.resolve(Path::new("src/lib.rs")).unwrap();
        assert_eq!(resolved, PathBuf::from("/tmp/conclave-sandbox-test/src/lib.rs"));
    }

    #[tokio::test]
    async fn read_write_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let sandbox = SandboxedFsExec::new(dir.path());
        sandbox.write_file(Path::new("notes.txt"), "hello").await.unwrap();
        let contents = sandbox.read_file(Path::new("notes.txt")).await.unwrap();
        assert_eq!(contents, "hello");
    }

    #[tokio::test]
    async fn exec_runs_within_sandbox_root() {
        let dir = tempfile::tempdir().unwrap();
        let sandbox = SandboxedFsExec::new(dir.path());
        let output = sandbox.exec("pwd", &[], 5).await.unwrap();
        assert!(output.succeeded());
        assert!(output.stdout.trim().ends_with(dir.path().file_name().unwrap().to_str().unwrap()));
    }
}
