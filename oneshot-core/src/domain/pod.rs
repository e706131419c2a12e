//! Pod domain types

use serde::{Deserialize, Serialize};
use std::fmt;

/// Name of the single container inside every pod the runner creates
pub const MAIN_CONTAINER_NAME: &str = "main-container";

/// Lifecycle phase reported by the orchestrator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PodPhase {
    Pending,
    Running,
    Succeeded,
    Failed,
    Unknown,
}

impl PodPhase {
    /// Maps the orchestrator's phase string; anything unrecognised is `Unknown`
    pub fn parse(phase: &str) -> Self {
        match phase {
            "Pending" => Self::Pending,
            "Running" => Self::Running,
            "Succeeded" => Self::Succeeded,
            "Failed" => Self::Failed,
            _ => Self::Unknown,
        }
    }

    /// The pod will not run again and its logs are final
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed)
    }
}

impl fmt::Display for PodPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PodEventKind {
    Applied,
    Deleted,
}

/// One change observed on the pod watch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PodEvent {
    pub kind: PodEventKind,
    pub name: String,
    pub phase: Option<PodPhase>,
}

impl PodEvent {
    pub fn applied(name: impl Into<String>, phase: Option<PodPhase>) -> Self {
        Self {
            kind: PodEventKind::Applied,
            name: name.into(),
            phase,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.phase.is_some_and(PodPhase::is_terminal)
    }
}
