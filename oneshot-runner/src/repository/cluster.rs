//! Cluster orchestrator repository
//!
//! Wraps the namespaced pod API behind the `PodApi` trait: create, watch,
//! fetch logs, delete.

use async_trait::async_trait;
use futures_util::future;
use futures_util::io::AsyncReadExt;
use futures_util::stream::{BoxStream, StreamExt};
use k8s_openapi::api::core::v1::{Container, Pod, PodSpec};
use kube::api::{Api, DeleteParams, LogParams, ObjectMeta, PostParams};
use kube::config::{KubeConfigOptions, Kubeconfig};
use kube::runtime::watcher;
use kube::{Client, Config};
use oneshot_core::domain::credentials::KubeconfigSource;
use oneshot_core::domain::pod::{PodEvent, PodEventKind, PodPhase};
use std::collections::BTreeMap;
use std::io::ErrorKind;
use thiserror::Error;
use tracing::debug;

use super::engine::{MANAGED_BY_LABEL, MANAGED_BY_VALUE};
use crate::error::{Result, RunError, Stage};
use crate::service::OutputBuffer;

const LOG_CHUNK_SIZE: usize = 8 * 1024;

/// Why a pod watch stopped delivering events
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WatchError {
    /// The subscription was cancelled; not a failure
    #[error("watch aborted")]
    Aborted,

    #[error("{0}")]
    Failed(String),
}

/// Ordered pod events for one namespace
pub type PodEventStream = BoxStream<'static, std::result::Result<PodEvent, WatchError>>;

/// The single-container pod to create
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PodTemplate {
    pub name: String,
    pub image: String,
    pub args: Vec<String>,
    pub container_name: String,
}

/// Repository trait for pod operations in a cluster
#[async_trait]
pub trait PodApi: Send + Sync {
    async fn create_pod(&self, namespace: &str, template: &PodTemplate) -> Result<()>;

    /// Subscribes to changes of the pod named `pod` in a namespace
    ///
    /// The stream is unbounded. Implementations may narrow it to the named
    /// pod, but callers must still ignore events for other pods.
    async fn watch_pods(&self, namespace: &str, pod: &str) -> Result<PodEventStream>;

    /// Reads the complete log of one container into `sink`
    async fn fetch_logs(
        &self,
        namespace: &str,
        pod: &str,
        container: &str,
        sink: &OutputBuffer,
    ) -> Result<()>;

    /// Deletes a pod; a pod that no longer exists is not an error
    async fn delete_pod(&self, namespace: &str, pod: &str) -> Result<()>;
}

/// kube implementation of PodApi
#[derive(Clone)]
pub struct KubePodApi {
    client: Client,
}

impl KubePodApi {
    /// Builds a client from a resolved kubeconfig source
    pub async fn connect(source: &KubeconfigSource) -> Result<Self> {
        let client = match source {
            KubeconfigSource::Automatic => Client::try_default()
                .await
                .map_err(|e| RunError::cluster(Stage::Connect, e))?,
            KubeconfigSource::File(path) => {
                let kubeconfig = Kubeconfig::read_from(path).map_err(|e| {
                    RunError::cluster(
                        Stage::Connect,
                        format!("failed to read kubeconfig {}: {}", path.display(), e),
                    )
                })?;
                client_from_kubeconfig(kubeconfig).await?
            }
            KubeconfigSource::Content(content) => {
                let kubeconfig = Kubeconfig::from_yaml(content).map_err(|e| {
                    RunError::cluster(Stage::Connect, format!("failed to parse kubeconfig: {}", e))
                })?;
                client_from_kubeconfig(kubeconfig).await?
            }
        };

        Ok(Self { client })
    }

    pub fn with_client(client: Client) -> Self {
        Self { client }
    }

    fn pods(&self, namespace: &str) -> Api<Pod> {
        Api::namespaced(self.client.clone(), namespace)
    }
}

async fn client_from_kubeconfig(kubeconfig: Kubeconfig) -> Result<Client> {
    let config = Config::from_custom_kubeconfig(kubeconfig, &KubeConfigOptions::default())
        .await
        .map_err(|e| RunError::cluster(Stage::Connect, e))?;
    Client::try_from(config).map_err(|e| RunError::cluster(Stage::Connect, e))
}

#[async_trait]
impl PodApi for KubePodApi {
    async fn create_pod(&self, namespace: &str, template: &PodTemplate) -> Result<()> {
        self.pods(namespace)
            .create(&PostParams::default(), &build_pod(template))
            .await
            .map_err(|e| RunError::cluster(Stage::CreatePod, e))?;
        Ok(())
    }

    async fn watch_pods(&self, namespace: &str, pod: &str) -> Result<PodEventStream> {
        let events = watcher(self.pods(namespace), watch_config(pod))
            .filter_map(|item| future::ready(watch_item(item)))
            .boxed();

        Ok(events)
    }

    async fn fetch_logs(
        &self,
        namespace: &str,
        pod: &str,
        container: &str,
        sink: &OutputBuffer,
    ) -> Result<()> {
        let params = LogParams {
            container: Some(container.to_string()),
            ..LogParams::default()
        };

        let reader = self
            .pods(namespace)
            .log_stream(pod, &params)
            .await
            .map_err(|e| RunError::cluster(Stage::FetchLogs, e))?;
        let mut reader = Box::pin(reader);

        let mut chunk = vec![0u8; LOG_CHUNK_SIZE];
        loop {
            let read = reader
                .read(&mut chunk)
                .await
                .map_err(|e| RunError::cluster(Stage::FetchLogs, e))?;
            if read == 0 {
                break;
            }
            sink.write(&chunk[..read]);
        }

        debug!("Read {} bytes of logs from {}/{}", sink.len(), namespace, pod);
        Ok(())
    }

    async fn delete_pod(&self, namespace: &str, pod: &str) -> Result<()> {
        match self
            .pods(namespace)
            .delete(pod, &DeleteParams::default())
            .await
        {
            Ok(_) => Ok(()),
            Err(kube::Error::Api(response)) if response.code == 404 => {
                debug!("Pod {}/{} was already deleted", namespace, pod);
                Ok(())
            }
            Err(e) => Err(RunError::cluster(Stage::DeletePod, e)),
        }
    }
}

/// Builds the pod object: restart policy `Never`, exactly one container
pub(crate) fn build_pod(template: &PodTemplate) -> Pod {
    Pod {
        metadata: ObjectMeta {
            name: Some(template.name.clone()),
            labels: Some(BTreeMap::from([(
                MANAGED_BY_LABEL.to_string(),
                MANAGED_BY_VALUE.to_string(),
            )])),
            ..ObjectMeta::default()
        },
        spec: Some(PodSpec {
            restart_policy: Some("Never".to_string()),
            containers: vec![Container {
                name: template.container_name.clone(),
                image: Some(template.image.clone()),
                args: Some(template.args.clone()),
                ..Container::default()
            }],
            ..PodSpec::default()
        }),
        ..Pod::default()
    }
}

/// Server-side filter on the pod name
pub(crate) fn watch_config(pod: &str) -> watcher::Config {
    watcher::Config::default().fields(&format!("metadata.name={}", pod))
}

/// Maps one watcher item; list markers carry no pod and are skipped
pub(crate) fn watch_item(
    item: std::result::Result<watcher::Event<Pod>, watcher::Error>,
) -> Option<std::result::Result<PodEvent, WatchError>> {
    match item {
        Ok(watcher::Event::Apply(pod)) | Ok(watcher::Event::InitApply(pod)) => {
            Some(Ok(pod_event(PodEventKind::Applied, &pod)))
        }
        Ok(watcher::Event::Delete(pod)) => Some(Ok(pod_event(PodEventKind::Deleted, &pod))),
        Ok(watcher::Event::Init) | Ok(watcher::Event::InitDone) => None,
        Err(e) => Some(Err(classify_watch_error(&e))),
    }
}

pub(crate) fn pod_event(kind: PodEventKind, pod: &Pod) -> PodEvent {
    PodEvent {
        kind,
        name: pod.metadata.name.clone().unwrap_or_default(),
        phase: pod
            .status
            .as_ref()
            .and_then(|status| status.phase.as_deref())
            .map(PodPhase::parse),
    }
}

fn classify_watch_error(err: &watcher::Error) -> WatchError {
    if is_aborted(err) {
        WatchError::Aborted
    } else {
        WatchError::Failed(err.to_string())
    }
}

/// True when the error chain contains an aborted connection
pub(crate) fn is_aborted(err: &(dyn std::error::Error + 'static)) -> bool {
    let mut current = Some(err);
    while let Some(e) = current {
        if let Some(io) = e.downcast_ref::<std::io::Error>() {
            if io.kind() == ErrorKind::ConnectionAborted {
                return true;
            }
        }
        current = e.source();
    }
    false
}
