//! Oneshot Core
//!
//! Core types and validation for running a single short-lived containerized
//! task against a local container engine or a cluster orchestrator.
//!
//! This crate contains:
//! - Domain types: mounts, run requests, results, pod phases, queries, credentials
//! - Errors: validation and configuration failures raised before any I/O

pub mod domain;
pub mod error;

pub use error::{ConfigurationError, ValidationError};
