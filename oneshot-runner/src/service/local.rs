//! Local runner
//!
//! Runs one task on the local container engine:
//! - Validating the request and translating mounts
//! - Pulling the image before anything is created
//! - Creating, attaching to and starting a single container
//! - Capturing stdout and stderr into separate buffers
//! - Removing the container on every exit path

use futures_util::StreamExt;
use oneshot_core::domain::mount::translate;
use oneshot_core::domain::query::EngineQuery;
use oneshot_core::domain::run::{ExecutionResult, RunRequest};
use serde_json::Value as JsonValue;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};
use uuid::Uuid;

use crate::config::RunnerConfig;
use crate::error::{Result, RunError, Stage};
use crate::repository::{ContainerEngine, ContainerSpec, OutputChunk};
use crate::service::cleanup::{CleanupGuard, flatten_timeout, settle};
use crate::service::output_buffer::OutputBuffer;

/// Runs tasks as containers on a local engine
pub struct LocalRunner {
    engine: Arc<dyn ContainerEngine>,
    config: RunnerConfig,
}

impl LocalRunner {
    pub fn new(engine: Arc<dyn ContainerEngine>, config: RunnerConfig) -> Self {
        Self { engine, config }
    }

    /// Runs a task to completion and returns its captured output
    ///
    /// A non-zero exit code is recorded in the result, not returned as an
    /// error. Cancelling `cancel` stops the run with `RunError::Cancelled`;
    /// the container is removed either way.
    pub async fn run(
        &self,
        request: &RunRequest,
        cancel: &CancellationToken,
    ) -> Result<ExecutionResult> {
        request.validate().map_err(RunError::InvalidRequest)?;
        let volumes = translate(&request.mounts).map_err(RunError::InvalidMounts)?;

        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                return Err(RunError::Cancelled { stage: Stage::PullImage });
            }
            pulled = self.engine.pull_image(&request.image) => pulled?,
        }

        let spec = ContainerSpec {
            name: format!("oneshot-{}", Uuid::new_v4()),
            image: request.image.clone(),
            command: request.command.clone(),
            working_dir: request.effective_working_dir().map(str::to_string),
            volumes,
        };

        // Registered before the create call and keyed by name, so a run dropped
        // mid-create still removes whatever the engine created
        let resource = format!("container {}", spec.name);
        let guard = {
            let engine = Arc::clone(&self.engine);
            let name = spec.name.clone();
            CleanupGuard::new(resource.clone(), move || async move {
                engine.remove_container(&name).await
            })
        };

        let id = match self.engine.create_container(&spec).await {
            Ok(id) => id,
            Err(e) => {
                guard.disarm();
                return Err(e);
            }
        };
        info!("Created container {} ({}) from {}", spec.name, id, spec.image);

        let timeout = self.config.container_timeout;
        let outcome = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                info!("Run of {} cancelled", spec.name);
                Err(RunError::Cancelled { stage: Stage::WaitContainer })
            }
            result = tokio::time::timeout(timeout, self.execute(&id)) => {
                flatten_timeout(result, || RunError::Timeout {
                    stage: Stage::WaitContainer,
                    after: timeout,
                })
            }
        };

        let cleanup = guard.release().await;
        if cleanup.is_ok() {
            info!("Removed {}", resource);
        }

        settle(outcome, cleanup, &resource)
    }

    /// Executes a pass-through get or list query against the engine
    pub async fn query(&self, query: &EngineQuery) -> Result<JsonValue> {
        debug!("Executing engine query {}", query.action_name());
        self.engine.query(query).await
    }

    /// Attaches before starting so no output is missed, then drains the
    /// output until the container exits
    async fn execute(&self, id: &str) -> Result<ExecutionResult> {
        let mut output = self.engine.attach_output(id).await?;
        self.engine.start_container(id).await?;

        let stdout = OutputBuffer::new();
        let stderr = OutputBuffer::new();
        while let Some(chunk) = output.next().await {
            match chunk? {
                OutputChunk::Stdout(bytes) => stdout.write(&bytes),
                OutputChunk::Stderr(bytes) => stderr.write(&bytes),
            }
        }

        let exit_code = self.engine.wait_container(id).await?;
        info!(
            "Container {} exited with code {} ({} bytes stdout, {} bytes stderr)",
            id,
            exit_code,
            stdout.len(),
            stderr.len()
        );

        Ok(ExecutionResult {
            stdout: stdout.contents(),
            stderr: stderr.contents(),
            exit_code,
        })
    }
}
