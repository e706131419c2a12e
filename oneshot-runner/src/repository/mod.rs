//! Repository layer
//!
//! Repositories are thin clients over the two backend APIs. They translate
//! between domain types and the wire models of bollard and kube without any
//! orchestration logic of their own; sequencing, cleanup and timeouts live
//! in the service layer.
//!
//! All repositories are trait-based to enable testing and mocking.

mod cluster;
mod engine;

// Re-export traits
pub use cluster::PodApi;
pub use engine::ContainerEngine;

// Re-export implementations
pub use cluster::KubePodApi;
pub use engine::DockerEngine;

// Re-export wire-neutral types
pub use cluster::{PodEventStream, PodTemplate, WatchError};
pub use engine::{ContainerSpec, OutputChunk, OutputStream};
