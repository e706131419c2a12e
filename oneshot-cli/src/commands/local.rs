//! Local engine command handlers
//!
//! Handles pass-through `get`/`list` queries and one-shot `run` on the
//! local container engine.

use anyhow::{Context, Result};
use clap::{Args, Subcommand};
use colored::*;
use oneshot_core::domain::credentials::EngineCredentials;
use oneshot_core::domain::mount::MountDescriptor;
use oneshot_core::domain::query::{EngineQuery, ListOptions, Resource};
use oneshot_core::domain::run::{ExecutionResult, RunRequest, parse_command};
use oneshot_runner::LocalRunner;
use oneshot_runner::repository::DockerEngine;
use std::process::ExitCode;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use crate::config::Config;

/// Engine connection flags
#[derive(Args, Debug, Clone, Default)]
pub struct EngineArgs {
    /// Path of the engine's unix socket
    #[arg(long, env = "ONESHOT_ENGINE_SOCKET")]
    pub socket_path: Option<String>,

    /// Remote engine host (conflicts with --socket-path)
    #[arg(long, env = "ONESHOT_ENGINE_HOST")]
    pub host: Option<String>,

    /// Remote engine port (default: 2375)
    #[arg(long, env = "ONESHOT_ENGINE_PORT")]
    pub port: Option<u16>,

    /// Remote engine protocol (only http is supported)
    #[arg(long, env = "ONESHOT_ENGINE_PROTOCOL")]
    pub protocol: Option<String>,
}

impl From<EngineArgs> for EngineCredentials {
    fn from(args: EngineArgs) -> Self {
        Self {
            socket_path: args.socket_path,
            host: args.host,
            port: args.port,
            protocol: args.protocol,
        }
    }
}

/// Local engine subcommands
#[derive(Subcommand, Debug)]
pub enum LocalCommands {
    /// Inspect one container, image, volume or network
    Get {
        /// container, image, volume or network
        resource: Resource,

        /// Id or name of the object
        id: String,
    },
    /// List containers, images, volumes or networks
    List {
        /// container, image, volume or network
        resource: Resource,

        /// List options as JSON, e.g. '{"all": true}'
        #[arg(long)]
        options: Option<String>,
    },
    /// Run a task in a fresh container and print its output
    Run {
        /// Image to run (e.g., alpine:3.20)
        #[arg(long)]
        image: String,

        /// Command as a JSON array, e.g. '["sh", "-c", "echo hi"]'
        #[arg(long)]
        command: Option<String>,

        /// Mount as HOST:CONTAINER[:ro|rw], repeatable
        #[arg(long = "mount", value_name = "MOUNT")]
        mounts: Vec<MountDescriptor>,

        /// Working directory inside the container
        #[arg(long)]
        workdir: Option<String>,
    },
}

/// Handle local engine commands
pub async fn handle_local_command(
    engine: EngineArgs,
    command: LocalCommands,
    config: &Config,
    cancel: &CancellationToken,
) -> Result<ExitCode> {
    let endpoint = EngineCredentials::from(engine)
        .resolve()
        .context("Invalid engine connection settings")?;
    let engine = DockerEngine::connect(&endpoint, config.runner.engine_timeout_secs)
        .context("Failed to connect to the container engine")?;
    let runner = LocalRunner::new(Arc::new(engine), config.runner.clone());

    match command {
        LocalCommands::Get { resource, id } => {
            let query = EngineQuery::get(resource, id)?;
            query_engine(&runner, &query).await
        }
        LocalCommands::List { resource, options } => {
            let options = ListOptions::parse(options.as_deref().unwrap_or_default())?;
            query_engine(&runner, &EngineQuery::list(resource, options)).await
        }
        LocalCommands::Run {
            image,
            command,
            mounts,
            workdir,
        } => {
            let request = build_request(image, command.as_deref(), mounts, workdir)?;
            run_task(&runner, &request, config, cancel).await
        }
    }
}

fn build_request(
    image: String,
    command: Option<&str>,
    mounts: Vec<MountDescriptor>,
    workdir: Option<String>,
) -> Result<RunRequest> {
    let command = parse_command(command.unwrap_or_default()).context("Invalid --command")?;

    Ok(RunRequest {
        image,
        command,
        mounts,
        working_dir: workdir,
    })
}

async fn query_engine(runner: &LocalRunner, query: &EngineQuery) -> Result<ExitCode> {
    let response = runner
        .query(query)
        .await
        .with_context(|| format!("{} failed", query.action_name()))?;

    println!("{}", serde_json::to_string_pretty(&response)?);
    Ok(ExitCode::SUCCESS)
}

async fn run_task(
    runner: &LocalRunner,
    request: &RunRequest,
    config: &Config,
    cancel: &CancellationToken,
) -> Result<ExitCode> {
    let result = runner.run(request, cancel).await?;

    if config.json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        print_execution_result(&result);
    }

    Ok(ExitCode::from(exit_status(&result)))
}

fn print_execution_result(result: &ExecutionResult) {
    if !result.stdout.is_empty() {
        print!("{}", result.stdout);
    }
    if !result.stderr.is_empty() {
        eprint!("{}", result.stderr.red());
    }

    let status = if result.succeeded() {
        format!("Exited with code {}", result.exit_code).green()
    } else {
        format!("Exited with code {}", result.exit_code).red()
    };
    eprintln!("{}", status.bold());
}

/// Exit codes outside 0..=255 are reported as a generic failure
fn exit_status(result: &ExecutionResult) -> u8 {
    u8::try_from(result.exit_code).unwrap_or(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_request_parses_command() {
        let request = build_request(
            "alpine".to_string(),
            Some(r#"["echo", "hi"]"#),
            vec!["/data:/app/data:ro".parse().unwrap()],
            Some("/app".to_string()),
        )
        .unwrap();

        assert_eq!(request.command, vec!["echo", "hi"]);
        assert_eq!(request.mounts[0], MountDescriptor::new("/data", "/app/data", true));
        assert_eq!(request.effective_working_dir(), Some("/app"));
    }

    #[test]
    fn test_build_request_without_command() {
        let request = build_request("alpine".to_string(), None, vec![], None).unwrap();
        assert!(request.command.is_empty());
    }

    #[test]
    fn test_build_request_rejects_non_array_command() {
        assert!(build_request("alpine".to_string(), Some("echo hi"), vec![], None).is_err());
    }

    #[test]
    fn test_exit_code_passthrough() {
        let mut result = ExecutionResult::default();
        assert_eq!(exit_status(&result), 0);

        result.exit_code = 3;
        assert_eq!(exit_status(&result), 3);

        result.exit_code = -1;
        assert_eq!(exit_status(&result), 1);
    }
}
