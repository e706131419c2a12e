//! Volume mount domain types
//!
//! Converts user supplied host/container path pairs into the two shapes the
//! local engine expects: a set of declared volume mount points and an ordered
//! list of bind strings (`host:container:mode`).

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::str::FromStr;

use crate::error::ValidationError;

/// One requested mount
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MountDescriptor {
    /// Path on the host machine or an engine volume name
    pub host_path: String,
    /// Path inside the container
    pub container_path: String,
    #[serde(default)]
    pub read_only: bool,
}

impl MountDescriptor {
    pub fn new(
        host_path: impl Into<String>,
        container_path: impl Into<String>,
        read_only: bool,
    ) -> Self {
        Self {
            host_path: host_path.into(),
            container_path: container_path.into(),
            read_only,
        }
    }
}

/// Parses `HOST:CONTAINER[:ro|rw]`
///
/// Only the shape is checked here; empty paths are left for [`translate`] to
/// reject so that every entry point reports them the same way.
impl FromStr for MountDescriptor {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (paths, read_only) = match s.rsplit_once(':') {
            Some((rest, "ro")) => (rest, true),
            Some((rest, "rw")) => (rest, false),
            _ => (s, false),
        };

        let (host_path, container_path) = paths
            .split_once(':')
            .ok_or_else(|| ValidationError::MalformedMount(s.to_string()))?;

        Ok(Self::new(host_path, container_path, read_only))
    }
}

/// Marker serialized as `{}`: declares a path as a volume mount point
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VolumeDeclaration {}

/// Engine-native volume configuration derived from a list of mounts
///
/// Built once per invocation by [`translate`] and never mutated afterwards.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct VolumeConfig {
    #[serde(rename = "Volumes")]
    volumes: BTreeMap<String, VolumeDeclaration>,
    #[serde(rename = "Binds")]
    binds: Vec<String>,
}

impl VolumeConfig {
    /// Declared container mount points
    pub fn volumes(&self) -> &BTreeMap<String, VolumeDeclaration> {
        &self.volumes
    }

    /// Bind strings in input order
    pub fn binds(&self) -> &[String] {
        &self.binds
    }

    pub fn is_empty(&self) -> bool {
        self.volumes.is_empty() && self.binds.is_empty()
    }
}

/// Validates mounts and converts them into a [`VolumeConfig`]
///
/// Fails on the first entry whose container or host path is empty after
/// trimming; no partial configuration is returned. Bind strings keep input
/// order and are neither reordered nor deduplicated.
pub fn translate(mounts: &[MountDescriptor]) -> Result<VolumeConfig, ValidationError> {
    let mut config = VolumeConfig::default();

    for (index, mount) in mounts.iter().enumerate() {
        let container_path = mount.container_path.trim();
        if container_path.is_empty() {
            return Err(ValidationError::MissingContainerPath { index });
        }

        let host_path = mount.host_path.trim();
        if host_path.is_empty() {
            return Err(ValidationError::MissingHostPath { index });
        }

        let mode = if mount.read_only { "ro" } else { "rw" };

        config
            .volumes
            .insert(container_path.to_string(), VolumeDeclaration {});
        config
            .binds
            .push(format!("{}:{}:{}", host_path, container_path, mode));
    }

    Ok(config)
}
