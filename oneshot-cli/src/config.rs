//! Configuration module
//!
//! Combines the output format chosen on the command line with the runner
//! settings read from the environment.

use anyhow::{Context, Result};
use oneshot_runner::RunnerConfig;

/// CLI configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Print JSON instead of formatted text
    pub json: bool,

    pub runner: RunnerConfig,
}

impl Config {
    /// Loads runner settings from `ONESHOT_*` variables and validates them
    pub fn load(json: bool) -> Result<Self> {
        let runner = RunnerConfig::from_env().context("Failed to read runner configuration")?;
        runner
            .validate()
            .context("Invalid runner configuration")?;

        Ok(Self { json, runner })
    }
}
