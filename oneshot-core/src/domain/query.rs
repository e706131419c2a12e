//! Pass-through engine queries
//!
//! `get` and `list` operations are a closed set of (operation, resource)
//! pairs. Each variant maps to exactly one engine call.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::ValidationError;

/// Engine object kinds that can be inspected or listed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Resource {
    Container,
    Image,
    Volume,
    Network,
}

impl Resource {
    fn capitalized(self) -> &'static str {
        match self {
            Self::Container => "Container",
            Self::Image => "Image",
            Self::Volume => "Volume",
            Self::Network => "Network",
        }
    }
}

impl FromStr for Resource {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "container" => Ok(Self::Container),
            "image" => Ok(Self::Image),
            "volume" => Ok(Self::Volume),
            "network" => Ok(Self::Network),
            _ => Err(ValidationError::UnknownResource(s.to_string())),
        }
    }
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.capitalized().to_ascii_lowercase())
    }
}

/// Options accepted by list operations
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListOptions {
    /// Include stopped containers / intermediate images
    #[serde(default)]
    pub all: bool,
}

impl ListOptions {
    pub fn parse(raw: &str) -> Result<Self, ValidationError> {
        if raw.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_json::from_str(raw).map_err(|e| ValidationError::InvalidListOptions(e.to_string()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineQuery {
    Get { resource: Resource, id: String },
    List { resource: Resource, options: ListOptions },
}

impl EngineQuery {
    pub fn get(resource: Resource, id: impl Into<String>) -> Result<Self, ValidationError> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err(ValidationError::MissingResourceId);
        }
        Ok(Self::Get { resource, id })
    }

    pub fn list(resource: Resource, options: ListOptions) -> Self {
        Self::List { resource, options }
    }

    pub fn resource(&self) -> Resource {
        match self {
            Self::Get { resource, .. } | Self::List { resource, .. } => *resource,
        }
    }

    /// Canonical action name, e.g. `getContainer` or `listImages`
    pub fn action_name(&self) -> String {
        match self {
            Self::Get { resource, .. } => format!("get{}", resource.capitalized()),
            Self::List { resource, .. } => format!("list{}s", resource.capitalized()),
        }
    }
}
