//! Run request and result types
//!
//! These types only exist for the duration of one invocation. They are
//! constructed by the caller, consumed once by a runner, and discarded.

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::domain::mount::MountDescriptor;
use crate::error::ValidationError;

/// A one-shot task for the local engine
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunRequest {
    pub image: String,
    #[serde(default)]
    pub command: Vec<String>,
    #[serde(default)]
    pub mounts: Vec<MountDescriptor>,
    #[serde(default)]
    pub working_dir: Option<String>,
}

impl RunRequest {
    pub fn new(image: impl Into<String>, command: Vec<String>) -> Self {
        Self {
            image: image.into(),
            command,
            ..Self::default()
        }
    }

    pub fn with_mount(mut self, mount: MountDescriptor) -> Self {
        self.mounts.push(mount);
        self
    }

    pub fn with_working_dir(mut self, dir: impl Into<String>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    /// Working directory, treating an empty string as unset
    pub fn effective_working_dir(&self) -> Option<&str> {
        self.working_dir
            .as_deref()
            .map(str::trim)
            .filter(|dir| !dir.is_empty())
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.image.trim().is_empty() {
            return Err(ValidationError::MissingImage);
        }
        Ok(())
    }
}

/// A one-shot task for the cluster orchestrator
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PodRunRequest {
    pub image: String,
    #[serde(default)]
    pub args: Vec<String>,
    /// Caller supplied pod name; generated when absent
    #[serde(default)]
    pub pod_name: Option<String>,
    /// Target namespace; the runner's configured default when absent
    #[serde(default)]
    pub namespace: Option<String>,
}

impl PodRunRequest {
    pub fn new(image: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            image: image.into(),
            args,
            ..Self::default()
        }
    }

    pub fn with_pod_name(mut self, name: impl Into<String>) -> Self {
        self.pod_name = Some(name.into());
        self
    }

    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.image.trim().is_empty() {
            return Err(ValidationError::MissingImage);
        }
        Ok(())
    }
}

/// Captured output of a local container
///
/// A non-zero exit code is recorded here and is not an error.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionResult {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: i64,
}

impl ExecutionResult {
    pub fn succeeded(&self) -> bool {
        self.exit_code == 0
    }
}

/// Parses a command given as a JSON array of strings
///
/// `"[]"` and blank input both yield an empty command, which means "use the
/// image default".
pub fn parse_command(raw: &str) -> Result<Vec<String>, ValidationError> {
    if raw.trim().is_empty() {
        return Ok(Vec::new());
    }

    let value: JsonValue = serde_json::from_str(raw)
        .map_err(|e| ValidationError::InvalidCommandJson(e.to_string()))?;

    let JsonValue::Array(items) = value else {
        return Err(ValidationError::CommandNotArray);
    };

    items
        .into_iter()
        .enumerate()
        .map(|(index, item)| match item {
            JsonValue::String(s) => Ok(s),
            _ => Err(ValidationError::CommandEntryNotString { index }),
        })
        .collect()
}
