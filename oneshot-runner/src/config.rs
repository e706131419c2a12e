//! Runner configuration
//!
//! Defines the configurable parameters of both runners: the default cluster
//! namespace, how pod names are generated, and how long a run may take.

use oneshot_core::ConfigurationError;
use std::time::Duration;

const DEFAULT_NAMESPACE: &str = "default";
const DEFAULT_POD_PREFIX: &str = "oneshot-pod";
const DEFAULT_RUN_TIMEOUT_SECS: u64 = 600;
const DEFAULT_ENGINE_TIMEOUT_SECS: u64 = 120;

/// Pod names are DNS-1123 labels; leave room for the generated suffix
const MAX_POD_PREFIX_LEN: usize = 30;

/// Runner configuration
///
/// Timeouts bound how long a single invocation can stay suspended waiting
/// for the backend.
#[derive(Debug, Clone)]
pub struct RunnerConfig {
    /// Namespace used when a pod request does not name one
    pub namespace: String,

    /// Prefix of generated pod names (e.g., "oneshot-pod")
    pub pod_name_prefix: String,

    /// Maximum time to wait for a pod to reach a terminal phase
    pub pod_timeout: Duration,

    /// Maximum time a local container may run
    pub container_timeout: Duration,

    /// Request timeout for socket / HTTP engine connections, in seconds
    pub engine_timeout_secs: u64,
}

impl RunnerConfig {
    /// Creates configuration from environment variables
    ///
    /// Expected environment variables (all optional):
    /// - ONESHOT_NAMESPACE (default: default)
    /// - ONESHOT_POD_PREFIX (default: oneshot-pod)
    /// - ONESHOT_POD_TIMEOUT (seconds, default: 600)
    /// - ONESHOT_CONTAINER_TIMEOUT (seconds, default: 600)
    /// - ONESHOT_ENGINE_TIMEOUT (seconds, default: 120)
    pub fn from_env() -> Result<Self, ConfigurationError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Creates configuration from an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigurationError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let namespace = lookup("ONESHOT_NAMESPACE").unwrap_or(defaults.namespace);
        let pod_name_prefix = lookup("ONESHOT_POD_PREFIX").unwrap_or(defaults.pod_name_prefix);

        let pod_timeout = parse_secs(&lookup, "ONESHOT_POD_TIMEOUT")?
            .map(Duration::from_secs)
            .unwrap_or(defaults.pod_timeout);

        let container_timeout = parse_secs(&lookup, "ONESHOT_CONTAINER_TIMEOUT")?
            .map(Duration::from_secs)
            .unwrap_or(defaults.container_timeout);

        let engine_timeout_secs =
            parse_secs(&lookup, "ONESHOT_ENGINE_TIMEOUT")?.unwrap_or(defaults.engine_timeout_secs);

        Ok(Self {
            namespace,
            pod_name_prefix,
            pod_timeout,
            container_timeout,
            engine_timeout_secs,
        })
    }

    /// Validates the configuration
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if self.namespace.trim().is_empty() {
            return Err(invalid("namespace", "cannot be empty"));
        }

        if self.pod_name_prefix.is_empty() {
            return Err(invalid("pod_name_prefix", "cannot be empty"));
        }

        if self.pod_name_prefix.len() > MAX_POD_PREFIX_LEN {
            return Err(invalid(
                "pod_name_prefix",
                format!("must be at most {} characters", MAX_POD_PREFIX_LEN),
            ));
        }

        let valid_label = self
            .pod_name_prefix
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
            && self.pod_name_prefix.starts_with(|c: char| c.is_ascii_alphanumeric());
        if !valid_label {
            return Err(invalid(
                "pod_name_prefix",
                "must consist of lowercase letters, digits and '-' and start with a letter or digit",
            ));
        }

        if self.pod_timeout.is_zero() {
            return Err(invalid("pod_timeout", "must be greater than 0"));
        }

        if self.container_timeout.is_zero() {
            return Err(invalid("container_timeout", "must be greater than 0"));
        }

        if self.engine_timeout_secs == 0 {
            return Err(invalid("engine_timeout", "must be greater than 0"));
        }

        Ok(())
    }
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            namespace: DEFAULT_NAMESPACE.to_string(),
            pod_name_prefix: DEFAULT_POD_PREFIX.to_string(),
            pod_timeout: Duration::from_secs(DEFAULT_RUN_TIMEOUT_SECS),
            container_timeout: Duration::from_secs(DEFAULT_RUN_TIMEOUT_SECS),
            engine_timeout_secs: DEFAULT_ENGINE_TIMEOUT_SECS,
        }
    }
}

fn parse_secs<F>(lookup: &F, key: &str) -> Result<Option<u64>, ConfigurationError>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key)
        .map(|raw| {
            raw.trim()
                .parse::<u64>()
                .map_err(|_| invalid(key, format!("'{}' is not a number of seconds", raw)))
        })
        .transpose()
}

fn invalid(key: &str, message: impl Into<String>) -> ConfigurationError {
    ConfigurationError::InvalidValue {
        key: key.to_string(),
        message: message.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_default_config() {
        let config = RunnerConfig::default();
        assert_eq!(config.namespace, "default");
        assert_eq!(config.pod_name_prefix, "oneshot-pod");
        assert_eq!(config.pod_timeout, Duration::from_secs(600));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_from_lookup_overrides() {
        let config = RunnerConfig::from_lookup(lookup_from(&[
            ("ONESHOT_NAMESPACE", "jobs"),
            ("ONESHOT_POD_TIMEOUT", "30"),
            ("ONESHOT_ENGINE_TIMEOUT", " 5 "),
        ]))
        .unwrap();

        assert_eq!(config.namespace, "jobs");
        assert_eq!(config.pod_timeout, Duration::from_secs(30));
        assert_eq!(config.container_timeout, Duration::from_secs(600));
        assert_eq!(config.engine_timeout_secs, 5);
    }

    #[test]
    fn test_from_lookup_rejects_bad_number() {
        let err = RunnerConfig::from_lookup(lookup_from(&[("ONESHOT_POD_TIMEOUT", "soon")]))
            .unwrap_err();
        assert!(matches!(err, ConfigurationError::InvalidValue { ref key, .. } if key == "ONESHOT_POD_TIMEOUT"));
    }

    #[test]
    fn test_config_validation() {
        let mut config = RunnerConfig::default();

        config.namespace = String::new();
        assert!(config.validate().is_err());
        config.namespace = "default".to_string();

        config.pod_name_prefix = "Bad_Prefix".to_string();
        assert!(config.validate().is_err());

        config.pod_name_prefix = "-leading".to_string();
        assert!(config.validate().is_err());

        config.pod_name_prefix = "a".repeat(31);
        assert!(config.validate().is_err());

        config.pod_name_prefix = "etl-job".to_string();
        assert!(config.validate().is_ok());

        config.pod_timeout = Duration::ZERO;
        assert!(config.validate().is_err());
    }
}
