//! Cluster runner
//!
//! Runs one task as a single-container pod and returns its logs. The pod
//! moves through `Created -> Watching -> {Succeeded | Failed} ->
//! LogsCollected -> Deleted`, or `Watching -> Aborted -> Deleted` when the
//! watch is aborted. Deletion happens exactly once on every path.

use futures_util::StreamExt;
use oneshot_core::domain::pod::{MAIN_CONTAINER_NAME, PodEventKind};
use oneshot_core::domain::run::PodRunRequest;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};
use uuid::Uuid;

use crate::config::RunnerConfig;
use crate::error::{Result, RunError, Stage};
use crate::repository::{PodApi, PodEventStream, PodTemplate, WatchError};
use crate::service::cleanup::{CleanupGuard, flatten_timeout, settle};
use crate::service::output_buffer::OutputBuffer;

/// Runs tasks as pods in a cluster namespace
pub struct ClusterRunner {
    api: Arc<dyn PodApi>,
    config: RunnerConfig,
}

impl ClusterRunner {
    pub fn new(api: Arc<dyn PodApi>, config: RunnerConfig) -> Self {
        Self { api, config }
    }

    /// Runs a pod to a terminal phase and returns its complete logs
    ///
    /// An aborted watch, including cancellation through `cancel`, is not an
    /// error: the call returns whatever logs were captured, usually nothing.
    ///
    /// # Arguments
    /// * `request` - Image, args and the optional pod name and namespace
    /// * `cancel` - Caller side abort signal
    pub async fn run_pod_and_get_output(
        &self,
        request: &PodRunRequest,
        cancel: &CancellationToken,
    ) -> Result<String> {
        request.validate().map_err(RunError::InvalidRequest)?;

        let namespace = request
            .namespace
            .as_deref()
            .filter(|ns| !ns.trim().is_empty())
            .unwrap_or(&self.config.namespace)
            .to_string();
        let pod = match request.pod_name.as_deref() {
            Some(name) if !name.trim().is_empty() => name.to_string(),
            _ => generate_pod_name(&self.config.pod_name_prefix),
        };

        let events = self.api.watch_pods(&namespace, &pod).await?;

        let template = PodTemplate {
            name: pod.clone(),
            image: request.image.clone(),
            args: request.args.clone(),
            container_name: MAIN_CONTAINER_NAME.to_string(),
        };

        // Registered before the create call so a run dropped mid-create still
        // deletes the pod; deleting a pod that was never created is a no-op
        let resource = format!("pod {}/{}", namespace, pod);
        let guard = {
            let api = Arc::clone(&self.api);
            let namespace = namespace.clone();
            let pod = pod.clone();
            CleanupGuard::new(resource.clone(), move || async move {
                api.delete_pod(&namespace, &pod).await
            })
        };

        if let Err(e) = self.api.create_pod(&namespace, &template).await {
            guard.disarm();
            return Err(e);
        }
        info!("Created pod {}/{} from {}", namespace, pod, request.image);

        let timeout = self.config.pod_timeout;
        let result = tokio::time::timeout(
            timeout,
            self.collect_output(&namespace, &pod, events, cancel),
        )
        .await;
        let outcome = flatten_timeout(result, || RunError::Timeout {
            stage: Stage::WatchPods,
            after: timeout,
        });

        let cleanup = guard.release().await;
        if cleanup.is_ok() {
            info!("Deleted {}", resource);
        }

        settle(outcome, cleanup, &resource)
    }

    /// Consumes pod events until the tracked pod reaches a terminal phase
    ///
    /// Logs are fetched once, for the first terminal event; the stream is
    /// dropped right after, so later events are never seen.
    async fn collect_output(
        &self,
        namespace: &str,
        pod: &str,
        mut events: PodEventStream,
        cancel: &CancellationToken,
    ) -> Result<String> {
        let logs = OutputBuffer::new();

        loop {
            let next = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    info!("Watch for pod {}/{} aborted by caller", namespace, pod);
                    return Ok(logs.contents());
                }
                next = events.next() => next,
            };

            match next {
                Some(Ok(event)) if event.name != pod => {
                    debug!("Ignoring event for unrelated pod {}", event.name);
                }
                Some(Ok(event)) => {
                    debug!("Pod {}/{} {:?}: phase {:?}", namespace, pod, event.kind, event.phase);
                    if event.is_terminal() {
                        info!(
                            "Pod {}/{} reached phase {:?}",
                            namespace, pod, event.phase
                        );
                        self.api
                            .fetch_logs(namespace, pod, MAIN_CONTAINER_NAME, &logs)
                            .await?;
                        return Ok(logs.contents());
                    }
                    if event.kind == PodEventKind::Deleted {
                        return Err(RunError::cluster(
                            Stage::WatchPods,
                            "pod deleted before reaching a terminal phase",
                        ));
                    }
                }
                Some(Err(WatchError::Aborted)) => {
                    info!("Watch for pod {}/{} aborted", namespace, pod);
                    return Ok(logs.contents());
                }
                Some(Err(WatchError::Failed(message))) => {
                    return Err(RunError::cluster(Stage::WatchPods, message));
                }
                None => {
                    return Err(RunError::WatchClosed {
                        pod: pod.to_string(),
                    });
                }
            }
        }
    }
}

/// Generates a unique pod name: `<prefix>-<32 hex digits>`
fn generate_pod_name(prefix: &str) -> String {
    format!("{}-{}", prefix, Uuid::new_v4().simple())
}
