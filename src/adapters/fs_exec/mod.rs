//! Sandboxed filesystem and process-execution adapters.

pub mod sandboxed;

pub use sandboxed::SandboxedFsExec;
