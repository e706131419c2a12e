//! Commands module
//!
//! Defines the backend subcommands and routes them to their handlers.

mod cluster;
mod local;

pub use cluster::{ClusterArgs, ClusterCommands};
pub use local::{EngineArgs, LocalCommands};

use anyhow::Result;
use clap::Subcommand;
use std::process::ExitCode;
use tokio_util::sync::CancellationToken;

use crate::config::Config;

/// Top-level CLI commands
#[derive(Subcommand)]
pub enum Commands {
    /// Local container engine (Docker or Podman API)
    Local {
        #[command(flatten)]
        engine: EngineArgs,

        #[command(subcommand)]
        command: LocalCommands,
    },
    /// Cluster orchestrator (Kubernetes)
    Cluster {
        #[command(flatten)]
        cluster: ClusterArgs,

        #[command(subcommand)]
        command: ClusterCommands,
    },
}

/// Handle a CLI command
///
/// # Arguments
/// * `command` - The command to execute
/// * `config` - The CLI configuration
/// * `cancel` - Cancelled on Ctrl-C
///
/// # Returns
/// The process exit code; a local task's non-zero exit is passed through
pub async fn handle_command(
    command: Commands,
    config: &Config,
    cancel: &CancellationToken,
) -> Result<ExitCode> {
    match command {
        Commands::Local { engine, command } => {
            local::handle_local_command(engine, command, config, cancel).await
        }
        Commands::Cluster { cluster, command } => {
            cluster::handle_cluster_command(cluster, command, config, cancel).await
        }
    }
}
