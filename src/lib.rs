//! Conclave: an orchestrator and task lifecycle engine that coordinates
//! Planner, Worker, and Judge agents over a shared task queue backed by
//! a source-controlled codebase.

pub mod adapters;
pub mod application;
pub mod cli;
pub mod domain;
pub mod infrastructure;
