//! Error types for the runners

use oneshot_core::{ConfigurationError, ValidationError};
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Result type alias for runner operations
pub type Result<T> = std::result::Result<T, RunError>;

/// The step of an invocation that failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Connect,
    PullImage,
    CreateContainer,
    AttachContainer,
    StartContainer,
    WaitContainer,
    RemoveContainer,
    Query,
    CreatePod,
    WatchPods,
    FetchLogs,
    DeletePod,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Connect => "connect",
            Self::PullImage => "pull image",
            Self::CreateContainer => "create container",
            Self::AttachContainer => "attach container",
            Self::StartContainer => "start container",
            Self::WaitContainer => "wait container",
            Self::RemoveContainer => "remove container",
            Self::Query => "query",
            Self::CreatePod => "create pod",
            Self::WatchPods => "watch pods",
            Self::FetchLogs => "fetch logs",
            Self::DeletePod => "delete pod",
        };
        f.write_str(name)
    }
}

/// Errors that can occur while running a task
#[derive(Debug, Error)]
pub enum RunError {
    /// A mount descriptor failed validation
    #[error("Volume mount configuration error: {0}")]
    InvalidMounts(#[source] ValidationError),

    /// Some other part of the request failed validation
    #[error("Invalid run request: {0}")]
    InvalidRequest(#[source] ValidationError),

    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigurationError),

    /// The local engine rejected a request
    #[error("Container engine error ({stage}): {message}")]
    Engine { stage: Stage, message: String },

    /// The cluster API rejected a request or the watch failed
    #[error("Cluster error ({stage}): {message}")]
    Cluster { stage: Stage, message: String },

    /// The pod watch ended without an abort and before a terminal phase
    #[error("Cluster error: watch for pod {pod} closed before it reached a terminal phase")]
    WatchClosed { pod: String },

    #[error("Timed out after {after:?} ({stage})")]
    Timeout { stage: Stage, after: Duration },

    #[error("Cancelled ({stage})")]
    Cancelled { stage: Stage },
}

impl RunError {
    pub fn engine(stage: Stage, err: impl fmt::Display) -> Self {
        Self::Engine {
            stage,
            message: err.to_string(),
        }
    }

    pub fn cluster(stage: Stage, err: impl fmt::Display) -> Self {
        Self::Cluster {
            stage,
            message: err.to_string(),
        }
    }

    /// Check if this error is a validation failure of the request
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::InvalidMounts(_) | Self::InvalidRequest(_))
    }

    /// Check if this error came from the local engine
    pub fn is_engine(&self) -> bool {
        matches!(self, Self::Engine { .. })
    }

    /// Check if this error came from the cluster
    pub fn is_cluster(&self) -> bool {
        matches!(self, Self::Cluster { .. } | Self::WatchClosed { .. })
    }

    /// The failing stage, when the error is tied to one
    pub fn stage(&self) -> Option<Stage> {
        match self {
            Self::Engine { stage, .. }
            | Self::Cluster { stage, .. }
            | Self::Timeout { stage, .. }
            | Self::Cancelled { stage } => Some(*stage),
            Self::WatchClosed { .. } => Some(Stage::WatchPods),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mount_error_is_prefixed() {
        let err = RunError::InvalidMounts(ValidationError::MissingHostPath { index: 0 });
        assert!(err.is_validation());
        assert_eq!(
            err.to_string(),
            "Volume mount configuration error: Host path is required for volume mount (entry 0)"
        );
    }

    #[test]
    fn test_stage_is_reported() {
        let err = RunError::engine(Stage::PullImage, "manifest unknown");
        assert!(err.is_engine());
        assert!(!err.is_cluster());
        assert_eq!(err.stage(), Some(Stage::PullImage));
        assert_eq!(
            err.to_string(),
            "Container engine error (pull image): manifest unknown"
        );
    }

    #[test]
    fn test_watch_closed_is_cluster_error() {
        let err = RunError::WatchClosed {
            pod: "p".to_string(),
        };
        assert!(err.is_cluster());
        assert_eq!(err.stage(), Some(Stage::WatchPods));
    }
}
