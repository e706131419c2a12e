//! Local container engine repository
//!
//! Wraps the engine's HTTP API (Docker or a compatible engine such as Podman)
//! behind the `ContainerEngine` trait. Each method maps to one engine call.

use async_trait::async_trait;
use bollard::{
    API_DEFAULT_VERSION, Docker,
    container::LogOutput,
    errors::Error as BollardError,
    models::{ContainerCreateBody, HostConfig},
    query_parameters::{
        AttachContainerOptionsBuilder, CreateContainerOptionsBuilder, CreateImageOptionsBuilder,
        InspectContainerOptions, InspectNetworkOptions, ListContainersOptionsBuilder,
        ListImagesOptionsBuilder, ListNetworksOptions, ListVolumesOptions,
        RemoveContainerOptionsBuilder, StartContainerOptions, WaitContainerOptions,
    },
};
use futures_util::future;
use futures_util::stream::{BoxStream, StreamExt, TryStreamExt};
use oneshot_core::domain::credentials::EngineEndpoint;
use oneshot_core::domain::mount::VolumeConfig;
use oneshot_core::domain::query::{EngineQuery, Resource};
use serde::Serialize;
use serde_json::Value as JsonValue;
use std::collections::HashMap;
use tracing::{debug, info};

use crate::error::{Result, RunError, Stage};

/// Label put on every workload the runner creates
pub(crate) const MANAGED_BY_LABEL: &str = "app.kubernetes.io/managed-by";
pub(crate) const MANAGED_BY_VALUE: &str = "oneshot";

/// A chunk of container output, already demultiplexed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputChunk {
    Stdout(Vec<u8>),
    Stderr(Vec<u8>),
}

/// Ordered output of an attached container; ends when the container exits
pub type OutputStream = BoxStream<'static, Result<OutputChunk>>;

/// Everything needed to create one container
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerSpec {
    pub name: String,
    pub image: String,
    /// Empty means the image default command
    pub command: Vec<String>,
    pub working_dir: Option<String>,
    pub volumes: VolumeConfig,
}

/// Repository trait for the local container engine
#[async_trait]
pub trait ContainerEngine: Send + Sync {
    /// Pulls an image, waiting for the pull to complete
    async fn pull_image(&self, image: &str) -> Result<()>;

    /// Creates (but does not start) a container
    ///
    /// # Returns
    /// The engine's container id
    async fn create_container(&self, spec: &ContainerSpec) -> Result<String>;

    /// Attaches to stdout and stderr of a created container
    ///
    /// Must be called before `start_container` so no output is lost.
    async fn attach_output(&self, id: &str) -> Result<OutputStream>;

    async fn start_container(&self, id: &str) -> Result<()>;

    /// Waits for the container process to exit
    ///
    /// # Returns
    /// The process exit code; a non-zero code is not an error
    async fn wait_container(&self, id: &str) -> Result<i64>;

    /// Force-removes a container; an already removed container is not an error
    async fn remove_container(&self, id: &str) -> Result<()>;

    /// Executes a pass-through get/list query and returns the raw response
    async fn query(&self, query: &EngineQuery) -> Result<JsonValue>;
}

/// bollard implementation of ContainerEngine
#[derive(Debug, Clone)]
pub struct DockerEngine {
    docker: Docker,
}

impl DockerEngine {
    /// Connects to the engine described by `endpoint`
    ///
    /// # Arguments
    /// * `endpoint` - Resolved engine endpoint
    /// * `timeout_secs` - Request timeout for socket and HTTP connections
    pub fn connect(endpoint: &EngineEndpoint, timeout_secs: u64) -> Result<Self> {
        let docker = match endpoint {
            EngineEndpoint::LocalDefaults => Docker::connect_with_local_defaults(),
            EngineEndpoint::Socket(path) => {
                Docker::connect_with_socket(path, timeout_secs, API_DEFAULT_VERSION)
            }
            EngineEndpoint::Http(url) => {
                Docker::connect_with_http(url, timeout_secs, API_DEFAULT_VERSION)
            }
        }
        .map_err(|e| RunError::engine(Stage::Connect, e))?;

        debug!("Container engine client created for {:?}", endpoint);
        Ok(Self { docker })
    }

    pub fn with_client(docker: Docker) -> Self {
        Self { docker }
    }
}

#[async_trait]
impl ContainerEngine for DockerEngine {
    async fn pull_image(&self, image: &str) -> Result<()> {
        let (from_image, tag) = split_image_reference(image);
        info!("Pulling image {}:{}", from_image, tag);

        self.docker
            .create_image(
                Some(
                    CreateImageOptionsBuilder::new()
                        .from_image(from_image)
                        .tag(tag)
                        .build(),
                ),
                None,
                None,
            )
            .try_collect::<Vec<_>>()
            .await
            .map_err(|e| RunError::engine(Stage::PullImage, e))?;

        Ok(())
    }

    async fn create_container(&self, spec: &ContainerSpec) -> Result<String> {
        let response = self
            .docker
            .create_container(
                Some(CreateContainerOptionsBuilder::new().name(&spec.name).build()),
                container_body(spec),
            )
            .await
            .map_err(|e| RunError::engine(Stage::CreateContainer, e))?;

        for warning in &response.warnings {
            debug!("Engine warning for container {}: {}", spec.name, warning);
        }

        Ok(response.id)
    }

    async fn attach_output(&self, id: &str) -> Result<OutputStream> {
        let attached = self
            .docker
            .attach_container(
                id,
                Some(
                    AttachContainerOptionsBuilder::new()
                        .stdout(true)
                        .stderr(true)
                        .stream(true)
                        .logs(true)
                        .build(),
                ),
            )
            .await
            .map_err(|e| RunError::engine(Stage::AttachContainer, e))?;

        let output = attached
            .output
            .filter_map(|item| future::ready(output_chunk(item)))
            .boxed();

        Ok(output)
    }

    async fn start_container(&self, id: &str) -> Result<()> {
        self.docker
            .start_container(id, None::<StartContainerOptions>)
            .await
            .map_err(|e| RunError::engine(Stage::StartContainer, e))
    }

    async fn wait_container(&self, id: &str) -> Result<i64> {
        let mut waits = Box::pin(self.docker.wait_container(id, None::<WaitContainerOptions>));

        match waits.next().await {
            Some(Ok(response)) => Ok(response.status_code),
            // bollard reports a non-zero exit as an error; it is a result here
            Some(Err(BollardError::DockerContainerWaitError { code, .. })) => Ok(code),
            Some(Err(e)) => Err(RunError::engine(Stage::WaitContainer, e)),
            None => Err(RunError::engine(
                Stage::WaitContainer,
                "engine closed the wait stream without an exit status",
            )),
        }
    }

    async fn remove_container(&self, id: &str) -> Result<()> {
        match self
            .docker
            .remove_container(
                id,
                Some(RemoveContainerOptionsBuilder::new().force(true).v(true).build()),
            )
            .await
        {
            Ok(()) => Ok(()),
            Err(e) if is_not_found_error(&e) => {
                debug!("Container {} was already removed", id);
                Ok(())
            }
            Err(e) => Err(RunError::engine(Stage::RemoveContainer, e)),
        }
    }

    async fn query(&self, query: &EngineQuery) -> Result<JsonValue> {
        match query {
            EngineQuery::Get { resource, id } => match resource {
                Resource::Container => to_json(
                    self.docker
                        .inspect_container(id, None::<InspectContainerOptions>)
                        .await,
                ),
                Resource::Image => to_json(self.docker.inspect_image(id).await),
                Resource::Volume => to_json(self.docker.inspect_volume(id).await),
                Resource::Network => to_json(
                    self.docker
                        .inspect_network(id, None::<InspectNetworkOptions>)
                        .await,
                ),
            },
            EngineQuery::List { resource, options } => match resource {
                Resource::Container => to_json(
                    self.docker
                        .list_containers(Some(
                            ListContainersOptionsBuilder::new().all(options.all).build(),
                        ))
                        .await,
                ),
                Resource::Image => to_json(
                    self.docker
                        .list_images(Some(ListImagesOptionsBuilder::new().all(options.all).build()))
                        .await,
                ),
                Resource::Volume => {
                    to_json(self.docker.list_volumes(None::<ListVolumesOptions>).await)
                }
                Resource::Network => {
                    to_json(self.docker.list_networks(None::<ListNetworksOptions>).await)
                }
            },
        }
    }
}

/// Builds the engine create body for a container spec
///
/// TTY stays disabled so stdout and stderr arrive demultiplexed.
pub(crate) fn container_body(spec: &ContainerSpec) -> ContainerCreateBody {
    let volumes: HashMap<String, HashMap<(), ()>> = spec
        .volumes
        .volumes()
        .keys()
        .map(|path| (path.clone(), HashMap::new()))
        .collect();
    let binds = spec.volumes.binds().to_vec();

    ContainerCreateBody {
        image: Some(spec.image.clone()),
        cmd: (!spec.command.is_empty()).then(|| spec.command.clone()),
        working_dir: spec.working_dir.clone(),
        volumes: (!volumes.is_empty()).then_some(volumes),
        labels: Some(HashMap::from([(
            MANAGED_BY_LABEL.to_string(),
            MANAGED_BY_VALUE.to_string(),
        )])),
        attach_stdout: Some(true),
        attach_stderr: Some(true),
        tty: Some(false),
        host_config: Some(HostConfig {
            binds: (!binds.is_empty()).then_some(binds),
            auto_remove: Some(false),
            ..HostConfig::default()
        }),
        ..ContainerCreateBody::default()
    }
}

/// Demultiplexes one attach frame; stdin echoes are dropped
pub(crate) fn output_chunk(
    item: std::result::Result<LogOutput, BollardError>,
) -> Option<Result<OutputChunk>> {
    match item {
        Ok(LogOutput::StdOut { message }) | Ok(LogOutput::Console { message }) => {
            Some(Ok(OutputChunk::Stdout(message.to_vec())))
        }
        Ok(LogOutput::StdErr { message }) => Some(Ok(OutputChunk::Stderr(message.to_vec()))),
        Ok(LogOutput::StdIn { .. }) => None,
        Err(e) => Some(Err(RunError::engine(Stage::AttachContainer, e))),
    }
}

/// Splits an image reference into the repository and the tag or digest
///
/// A colon only starts a tag when it comes after the last `/`, so registry
/// ports (`localhost:5000/app`) are kept in the repository part.
pub(crate) fn split_image_reference(image: &str) -> (&str, &str) {
    if let Some((repository, digest)) = image.split_once('@') {
        return (repository, digest);
    }

    let name_start = image.rfind('/').map_or(0, |i| i + 1);
    match image[name_start..].rfind(':') {
        Some(offset) => {
            let split = name_start + offset;
            (&image[..split], &image[split + 1..])
        }
        None => (image, "latest"),
    }
}

fn to_json<T: Serialize>(response: std::result::Result<T, BollardError>) -> Result<JsonValue> {
    let value = response.map_err(|e| RunError::engine(Stage::Query, e))?;
    serde_json::to_value(value).map_err(|e| RunError::engine(Stage::Query, e))
}

fn is_not_found_error(error: &BollardError) -> bool {
    matches!(
        error,
        BollardError::DockerResponseServerError {
            status_code: 404,
            ..
        }
    )
}
