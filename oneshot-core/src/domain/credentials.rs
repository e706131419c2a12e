//! Credential descriptors for both backends
//!
//! Raw credential fields arrive from the CLI or environment as loose optional
//! values. They are resolved here into a single validated source before any
//! connection is attempted.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::str::FromStr;

use crate::error::ConfigurationError;

/// Default TCP port of a remote engine API
pub const DEFAULT_ENGINE_PORT: u16 = 2375;

/// Where the cluster kubeconfig is loaded from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LoadFrom {
    /// In-cluster service account or the default kubeconfig discovery
    Automatic,
    File,
    Content,
}

impl FromStr for LoadFrom {
    type Err = ConfigurationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "automatic" => Ok(Self::Automatic),
            "file" => Ok(Self::File),
            "content" => Ok(Self::Content),
            other => Err(ConfigurationError::UnknownLoadFrom(other.to_string())),
        }
    }
}

/// Cluster credential fields as supplied by the caller
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterCredentials {
    #[serde(default)]
    pub load_from: Option<LoadFrom>,
    #[serde(default)]
    pub file_path: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
}

/// A resolved kubeconfig source
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KubeconfigSource {
    Automatic,
    File(PathBuf),
    Content(String),
}

impl ClusterCredentials {
    /// Resolves the selected source, failing fast when it is missing or empty
    pub fn resolve(&self) -> Result<KubeconfigSource, ConfigurationError> {
        match self.load_from {
            Some(LoadFrom::Automatic) => Ok(KubeconfigSource::Automatic),
            Some(LoadFrom::File) => non_empty(self.file_path.as_deref())
                .map(|path| KubeconfigSource::File(PathBuf::from(path)))
                .ok_or(ConfigurationError::FilePathNotSet),
            Some(LoadFrom::Content) => non_empty(self.content.as_deref())
                .map(|content| KubeconfigSource::Content(content.to_string()))
                .ok_or(ConfigurationError::ContentNotSet),
            None => Err(ConfigurationError::LoadFromNotSet),
        }
    }
}

/// Engine connection fields as supplied by the caller
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EngineCredentials {
    #[serde(default)]
    pub socket_path: Option<String>,
    #[serde(default)]
    pub host: Option<String>,
    #[serde(default)]
    pub port: Option<u16>,
    #[serde(default)]
    pub protocol: Option<String>,
}

/// A resolved engine endpoint
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineEndpoint {
    /// Platform default socket, honouring `DOCKER_HOST`
    LocalDefaults,
    Socket(String),
    /// Plain TCP URL, e.g. `http://10.0.0.5:2375`
    Http(String),
}

impl EngineCredentials {
    pub fn resolve(&self) -> Result<EngineEndpoint, ConfigurationError> {
        let socket = non_empty(self.socket_path.as_deref());
        let host = non_empty(self.host.as_deref());

        match (socket, host) {
            (Some(_), Some(_)) => Err(ConfigurationError::ConflictingEngineEndpoint),
            (Some(path), None) => Ok(EngineEndpoint::Socket(path.to_string())),
            (None, Some(host)) => {
                match non_empty(self.protocol.as_deref()).unwrap_or("http") {
                    "http" => {}
                    "https" => return Err(ConfigurationError::TlsNotSupported),
                    other => return Err(ConfigurationError::UnknownProtocol(other.to_string())),
                }
                let port = self.port.unwrap_or(DEFAULT_ENGINE_PORT);
                Ok(EngineEndpoint::Http(format!("http://{}:{}", host, port)))
            }
            (None, None) => Ok(EngineEndpoint::LocalDefaults),
        }
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cluster_load_from_required() {
        let creds = ClusterCredentials::default();
        assert_eq!(creds.resolve(), Err(ConfigurationError::LoadFromNotSet));
    }

    #[test]
    fn test_cluster_file_requires_path() {
        let creds = ClusterCredentials {
            load_from: Some(LoadFrom::File),
            file_path: Some("".to_string()),
            content: None,
        };
        assert_eq!(creds.resolve(), Err(ConfigurationError::FilePathNotSet));

        let creds = ClusterCredentials {
            file_path: Some("/etc/kube/config".to_string()),
            ..creds
        };
        assert_eq!(
            creds.resolve().unwrap(),
            KubeconfigSource::File(PathBuf::from("/etc/kube/config"))
        );
    }

    #[test]
    fn test_cluster_content_requires_content() {
        let creds = ClusterCredentials {
            load_from: Some(LoadFrom::Content),
            file_path: Some("/ignored".to_string()),
            content: None,
        };
        assert_eq!(creds.resolve(), Err(ConfigurationError::ContentNotSet));
    }

    #[test]
    fn test_cluster_automatic() {
        let creds = ClusterCredentials {
            load_from: Some(LoadFrom::Automatic),
            ..Default::default()
        };
        assert_eq!(creds.resolve().unwrap(), KubeconfigSource::Automatic);
    }

    #[test]
    fn test_load_from_parse() {
        assert_eq!("file".parse::<LoadFrom>().unwrap(), LoadFrom::File);
        assert!("disk".parse::<LoadFrom>().is_err());
    }

    #[test]
    fn test_engine_defaults() {
        let creds = EngineCredentials::default();
        assert_eq!(creds.resolve().unwrap(), EngineEndpoint::LocalDefaults);
    }

    #[test]
    fn test_engine_socket() {
        let creds = EngineCredentials {
            socket_path: Some("/run/podman/podman.sock".to_string()),
            ..Default::default()
        };
        assert_eq!(
            creds.resolve().unwrap(),
            EngineEndpoint::Socket("/run/podman/podman.sock".to_string())
        );
    }

    #[test]
    fn test_engine_host_defaults_port_and_protocol() {
        let creds = EngineCredentials {
            host: Some("10.0.0.5".to_string()),
            ..Default::default()
        };
        assert_eq!(
            creds.resolve().unwrap(),
            EngineEndpoint::Http("http://10.0.0.5:2375".to_string())
        );

        let creds = EngineCredentials {
            port: Some(2376),
            protocol: Some("http".to_string()),
            ..creds
        };
        assert_eq!(
            creds.resolve().unwrap(),
            EngineEndpoint::Http("http://10.0.0.5:2376".to_string())
        );
    }

    #[test]
    fn test_engine_rejects_https() {
        let creds = EngineCredentials {
            host: Some("127.0.0.1".to_string()),
            port: Some(1),
            protocol: Some("https".to_string()),
            ..Default::default()
        };
        assert_eq!(creds.resolve(), Err(ConfigurationError::TlsNotSupported));
    }

    #[test]
    fn test_engine_rejects_conflicting_endpoint() {
        let creds = EngineCredentials {
            socket_path: Some("/var/run/docker.sock".to_string()),
            host: Some("remote".to_string()),
            ..Default::default()
        };
        assert_eq!(
            creds.resolve(),
            Err(ConfigurationError::ConflictingEngineEndpoint)
        );
    }

    #[test]
    fn test_engine_rejects_unknown_protocol() {
        let creds = EngineCredentials {
            host: Some("remote".to_string()),
            protocol: Some("ftp".to_string()),
            ..Default::default()
        };
        assert!(matches!(
            creds.resolve(),
            Err(ConfigurationError::UnknownProtocol(_))
        ));
    }
}
