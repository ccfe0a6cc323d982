//! Shared fixtures for the crate's black-box integration tests.

use std::path::{Path, PathBuf};
use std::process::Command;

use conclave::adapters::sqlite::{
    create_migrated_test_pool, SqliteAgentStore, SqliteCycleStore, SqliteTaskStore, SqliteVerdictStore,
};
use sqlx::SqlitePool;
use tempfile::TempDir;

/// Initialize a throwaway git repository with one seed commit, suitable
/// for the VCS/fs_exec adapters to operate against.
pub fn init_repo() -> TempDir {
    let dir = tempfile::tempdir().expect("failed to create temp dir");
    let run = |args: &[&str]| {
        assert!(Command::new("git").args(args).current_dir(dir.path()).status().unwrap().success());
    };
    run(&["init", "-q", "-b", "main"]);
    run(&["config", "user.email", "test@example.com"]);
    run(&["config", "user.name", "test"]);
    std::fs::write(dir.path().join("README.md"), "seed\n").unwrap();
    run(&["add", "-A"]);
    run(&["commit", "-q", "-m", "seed"]);
    dir
}

/// One migrated pool plus every sqlite store built on top of it, so
/// tests can cross-reference tasks/agents/cycles/verdicts without
/// foreign-key violations.
pub struct Stores {
    pub pool: SqlitePool,
    pub task_store: SqliteTaskStore,
    pub agent_store: SqliteAgentStore,
    pub cycle_store: SqliteCycleStore,
    pub verdict_store: SqliteVerdictStore,
}

pub async fn stores() -> Stores {
    let pool = create_migrated_test_pool().await.expect("failed to build migrated test pool");
    Stores {
        task_store: SqliteTaskStore::new(pool.clone()),
        agent_store: SqliteAgentStore::new(pool.clone()),
        cycle_store: SqliteCycleStore::new(pool.clone()),
        verdict_store: SqliteVerdictStore::new(pool.clone()),
        pool,
    }
}

pub fn repo_path(dir: &TempDir) -> PathBuf {
    dir.path().to_path_buf()
}

#[allow(dead_code)]
pub fn file_contents(dir: &TempDir, relative: &str) -> String {
    std::fs::read_to_string(Path::new(dir.path()).join(relative)).expect("expected file to exist")
}
