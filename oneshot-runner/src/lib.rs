//! Oneshot Runner
//!
//! Runs one short-lived containerized task end to end and returns its output.
//!
//! Architecture:
//! - Configuration: runner settings from environment or defaults
//! - Repositories: thin clients for the local engine (bollard) and the
//!   cluster orchestrator (kube)
//! - Services: the local and cluster runners, output sinks and scoped cleanup
//!
//! Every workload created by a runner is removed before the call returns,
//! whether it succeeded, failed or was cancelled.

pub mod config;
pub mod error;
pub mod repository;
pub mod service;

#[cfg(test)]
mod testing;

pub use config::RunnerConfig;
pub use error::{Result, RunError, Stage};
pub use service::{ClusterRunner, LocalRunner, OutputBuffer};
