//! Cluster command handlers
//!
//! Runs a task as a pod and prints its logs.

use anyhow::{Context, Result};
use clap::{Args, Subcommand};
use colored::*;
use oneshot_core::domain::credentials::{ClusterCredentials, LoadFrom};
use oneshot_core::domain::run::{PodRunRequest, parse_command};
use oneshot_runner::ClusterRunner;
use oneshot_runner::repository::KubePodApi;
use serde_json::json;
use std::process::ExitCode;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use crate::config::Config;

/// Kubeconfig source flags
#[derive(Args, Debug, Clone, Default)]
pub struct ClusterArgs {
    /// Where to load the kubeconfig from: automatic, file or content
    #[arg(long, env = "ONESHOT_LOAD_FROM")]
    pub load_from: Option<LoadFrom>,

    /// Kubeconfig path, used with --load-from file
    #[arg(long, env = "ONESHOT_KUBECONFIG")]
    pub kubeconfig: Option<String>,

    /// Inline kubeconfig YAML, used with --load-from content
    #[arg(long, env = "ONESHOT_KUBECONFIG_CONTENT", hide_env_values = true)]
    pub kubeconfig_content: Option<String>,
}

impl From<ClusterArgs> for ClusterCredentials {
    fn from(args: ClusterArgs) -> Self {
        Self {
            load_from: args.load_from,
            file_path: args.kubeconfig,
            content: args.kubeconfig_content,
        }
    }
}

/// Cluster subcommands
#[derive(Subcommand, Debug)]
pub enum ClusterCommands {
    /// Run a task as a pod and print its logs
    Run {
        /// Image to run (e.g., busybox:1.36)
        #[arg(long)]
        image: String,

        /// Container arguments as a JSON array, e.g. '["echo", "hi"]'
        #[arg(long)]
        args: Option<String>,

        /// Pod name (default: generated)
        #[arg(long)]
        pod_name: Option<String>,

        /// Target namespace (default: ONESHOT_NAMESPACE or "default")
        #[arg(long, short)]
        namespace: Option<String>,
    },
}

/// Handle cluster commands
pub async fn handle_cluster_command(
    cluster: ClusterArgs,
    command: ClusterCommands,
    config: &Config,
    cancel: &CancellationToken,
) -> Result<ExitCode> {
    let source = ClusterCredentials::from(cluster)
        .resolve()
        .context("Invalid cluster credentials")?;

    match command {
        ClusterCommands::Run {
            image,
            args,
            pod_name,
            namespace,
        } => {
            let args = parse_command(args.as_deref().unwrap_or_default()).context("Invalid --args")?;
            let request = PodRunRequest {
                image,
                args,
                pod_name,
                namespace,
            };

            let api = KubePodApi::connect(&source)
                .await
                .context("Failed to connect to the cluster")?;
            let runner = ClusterRunner::new(Arc::new(api), config.runner.clone());

            let logs = runner.run_pod_and_get_output(&request, cancel).await?;

            if config.json {
                println!("{}", serde_json::to_string_pretty(&json!({ "logs": logs }))?);
            } else if logs.is_empty() {
                eprintln!("{}", "No logs captured.".yellow());
            } else {
                print!("{}", logs);
            }

            Ok(ExitCode::SUCCESS)
        }
    }
}
