//! Error types raised before any backend is contacted

use thiserror::Error;

/// A malformed run request
///
/// Always names the offending field so the caller can fix the input.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// A mount entry has an empty (or whitespace-only) container path
    #[error("Container path is required for volume mount (entry {index})")]
    MissingContainerPath { index: usize },

    /// A mount entry has an empty (or whitespace-only) host path
    #[error("Host path is required for volume mount (entry {index})")]
    MissingHostPath { index: usize },

    /// A mount string could not be split into host and container paths
    #[error("Invalid mount '{0}': expected HOST:CONTAINER[:ro|rw]")]
    MalformedMount(String),

    #[error("Image is required")]
    MissingImage,

    #[error("Command is not valid JSON: {0}")]
    InvalidCommandJson(String),

    #[error("Command must be an array")]
    CommandNotArray,

    #[error("Command entry {index} must be a string")]
    CommandEntryNotString { index: usize },

    #[error("A resource id is required for get operations")]
    MissingResourceId,

    #[error("List options are not valid JSON: {0}")]
    InvalidListOptions(String),

    #[error("Unknown resource '{0}': expected container, image, volume or network")]
    UnknownResource(String),
}

impl ValidationError {
    /// Name of the input field the error refers to
    pub fn field(&self) -> &'static str {
        match self {
            Self::MissingContainerPath { .. } => "containerPath",
            Self::MissingHostPath { .. } => "hostPath",
            Self::MalformedMount(_) => "mount",
            Self::MissingImage => "image",
            Self::InvalidCommandJson(_)
            | Self::CommandNotArray
            | Self::CommandEntryNotString { .. } => "command",
            Self::MissingResourceId => "id",
            Self::InvalidListOptions(_) => "options",
            Self::UnknownResource(_) => "resource",
        }
    }
}

/// Missing or contradictory credential / runtime configuration
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigurationError {
    #[error("Load from value not set")]
    LoadFromNotSet,

    #[error("Unknown load from value '{0}': expected automatic, file or content")]
    UnknownLoadFrom(String),

    #[error("File path not set")]
    FilePathNotSet,

    #[error("Content not set")]
    ContentNotSet,

    #[error("Both a socket path and a host are set for the container engine")]
    ConflictingEngineEndpoint,

    #[error("Unknown engine protocol '{0}': expected http")]
    UnknownProtocol(String),

    /// TLS engine connections are not available; use a socket or plain http
    #[error("Engine protocol 'https' is not supported: connect over a socket or http")]
    TlsNotSupported,

    #[error("Invalid value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}
