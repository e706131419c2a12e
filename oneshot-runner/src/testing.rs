//! In-memory repositories for runner tests
//!
//! Both mocks record every call by short name ("pull", "create", "watch",
//! "logs", "delete", ...) so tests can assert on call order and counts.

use async_trait::async_trait;
use futures_util::stream::{self, StreamExt};
use oneshot_core::domain::pod::{PodEvent, PodPhase};
use oneshot_core::domain::query::EngineQuery;
use serde_json::{Value as JsonValue, json};
use std::sync::Mutex;
use tokio::sync::mpsc;

use crate::error::{Result, RunError, Stage};
use crate::repository::{
    ContainerEngine, ContainerSpec, OutputChunk, OutputStream, PodApi, PodEventStream,
    PodTemplate, WatchError,
};
use crate::service::OutputBuffer;

fn record(calls: &Mutex<Vec<String>>, call: &str) {
    calls.lock().unwrap().push(call.to_string());
}

pub struct MockEngine {
    calls: Mutex<Vec<String>>,
    failures: Vec<&'static str>,
    output: Vec<OutputChunk>,
    hang: bool,
    hang_create: bool,
    exit_code: i64,
    created: Mutex<Option<ContainerSpec>>,
    removed: Mutex<Vec<String>>,
}

impl MockEngine {
    pub fn new() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            failures: Vec::new(),
            output: Vec::new(),
            hang: false,
            hang_create: false,
            exit_code: 0,
            created: Mutex::new(None),
            removed: Mutex::new(Vec::new()),
        }
    }

    pub fn with_stdout(mut self, text: &str) -> Self {
        self.output.push(OutputChunk::Stdout(text.as_bytes().to_vec()));
        self
    }

    pub fn with_stderr(mut self, text: &str) -> Self {
        self.output.push(OutputChunk::Stderr(text.as_bytes().to_vec()));
        self
    }

    pub fn with_exit_code(mut self, code: i64) -> Self {
        self.exit_code = code;
        self
    }

    /// Makes the named call fail with an engine error
    pub fn failing_at(mut self, call: &'static str) -> Self {
        self.failures.push(call);
        self
    }

    /// Output stream never ends, as for a container that keeps running
    pub fn hanging_output(mut self) -> Self {
        self.hang = true;
        self
    }

    /// Create call never returns
    pub fn hanging_create(mut self) -> Self {
        self.hang_create = true;
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count(&self, call: &str) -> usize {
        self.calls.lock().unwrap().iter().filter(|c| *c == call).count()
    }

    pub fn created_spec(&self) -> Option<ContainerSpec> {
        self.created.lock().unwrap().clone()
    }

    pub fn removed(&self) -> Vec<String> {
        self.removed.lock().unwrap().clone()
    }

    fn enter(&self, call: &'static str, stage: Stage) -> Result<()> {
        record(&self.calls, call);
        if self.failures.contains(&call) {
            return Err(RunError::engine(stage, format!("{} failed", call)));
        }
        Ok(())
    }
}

#[async_trait]
impl ContainerEngine for MockEngine {
    async fn pull_image(&self, _image: &str) -> Result<()> {
        self.enter("pull", Stage::PullImage)
    }

    async fn create_container(&self, spec: &ContainerSpec) -> Result<String> {
        self.enter("create", Stage::CreateContainer)?;
        if self.hang_create {
            std::future::pending::<()>().await;
        }
        *self.created.lock().unwrap() = Some(spec.clone());
        Ok("container-id".to_string())
    }

    async fn attach_output(&self, _id: &str) -> Result<OutputStream> {
        self.enter("attach", Stage::AttachContainer)?;
        let chunks = stream::iter(self.output.clone().into_iter().map(Ok));
        if self.hang {
            Ok(chunks.chain(stream::pending()).boxed())
        } else {
            Ok(chunks.boxed())
        }
    }

    async fn start_container(&self, _id: &str) -> Result<()> {
        self.enter("start", Stage::StartContainer)
    }

    async fn wait_container(&self, _id: &str) -> Result<i64> {
        self.enter("wait", Stage::WaitContainer)?;
        Ok(self.exit_code)
    }

    async fn remove_container(&self, id: &str) -> Result<()> {
        self.enter("remove", Stage::RemoveContainer)?;
        self.removed.lock().unwrap().push(id.to_string());
        Ok(())
    }

    async fn query(&self, query: &EngineQuery) -> Result<JsonValue> {
        self.enter("query", Stage::Query)?;
        Ok(json!({ "action": query.action_name() }))
    }
}

/// What the watch stream does after the scripted events
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamEnd {
    Close,
    Pending,
}

type WatchItem = std::result::Result<PodEvent, WatchError>;

pub struct MockPodApi {
    calls: Mutex<Vec<String>>,
    failures: Vec<&'static str>,
    events: Vec<WatchItem>,
    end: StreamEnd,
    logs: String,
    track_created: bool,
    hang_create: bool,
    created_tx: Mutex<Option<mpsc::UnboundedSender<WatchItem>>>,
    created: Mutex<Option<(String, PodTemplate)>>,
    watched: Mutex<Vec<String>>,
    fetched: Mutex<Vec<String>>,
    deleted: Mutex<Vec<String>>,
}

impl MockPodApi {
    pub fn new() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            failures: Vec::new(),
            events: Vec::new(),
            end: StreamEnd::Close,
            logs: String::new(),
            track_created: false,
            hang_create: false,
            created_tx: Mutex::new(None),
            created: Mutex::new(None),
            watched: Mutex::new(Vec::new()),
            fetched: Mutex::new(Vec::new()),
            deleted: Mutex::new(Vec::new()),
        }
    }

    pub fn with_event(mut self, event: PodEvent) -> Self {
        self.events.push(Ok(event));
        self
    }

    pub fn with_error(mut self, error: WatchError) -> Self {
        self.events.push(Err(error));
        self
    }

    pub fn ending_with(mut self, end: StreamEnd) -> Self {
        self.end = end;
        self
    }

    pub fn with_logs(mut self, logs: &str) -> Self {
        self.logs = logs.to_string();
        self
    }

    /// Emits `Succeeded` for whatever pod gets created, for generated names
    pub fn tracking_created_pod(mut self) -> Self {
        self.track_created = true;
        self
    }

    /// Create call never returns
    pub fn hanging_create(mut self) -> Self {
        self.hang_create = true;
        self
    }

    /// Makes the named call fail with a cluster error
    pub fn failing_at(mut self, call: &'static str) -> Self {
        self.failures.push(call);
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count(&self, call: &str) -> usize {
        self.calls.lock().unwrap().iter().filter(|c| *c == call).count()
    }

    pub fn created(&self) -> Option<(String, PodTemplate)> {
        self.created.lock().unwrap().clone()
    }

    /// Watched pods as `namespace/name`
    pub fn watched(&self) -> Vec<String> {
        self.watched.lock().unwrap().clone()
    }

    pub fn fetched_pods(&self) -> Vec<String> {
        self.fetched.lock().unwrap().clone()
    }

    /// Deleted pods as `namespace/name`
    pub fn deleted(&self) -> Vec<String> {
        self.deleted.lock().unwrap().clone()
    }

    fn enter(&self, call: &'static str, stage: Stage) -> Result<()> {
        record(&self.calls, call);
        if self.failures.contains(&call) {
            return Err(RunError::cluster(stage, format!("{} failed", call)));
        }
        Ok(())
    }
}

#[async_trait]
impl PodApi for MockPodApi {
    async fn create_pod(&self, namespace: &str, template: &PodTemplate) -> Result<()> {
        self.enter("create", Stage::CreatePod)?;
        if self.hang_create {
            std::future::pending::<()>().await;
        }
        *self.created.lock().unwrap() = Some((namespace.to_string(), template.clone()));

        if let Some(tx) = self.created_tx.lock().unwrap().as_ref() {
            let _ = tx.send(Ok(PodEvent::applied(
                template.name.clone(),
                Some(PodPhase::Succeeded),
            )));
        }
        Ok(())
    }

    async fn watch_pods(&self, namespace: &str, pod: &str) -> Result<PodEventStream> {
        self.enter("watch", Stage::WatchPods)?;
        self.watched
            .lock()
            .unwrap()
            .push(format!("{}/{}", namespace, pod));
        let scripted = stream::iter(self.events.clone());

        if self.track_created {
            let (tx, rx) = mpsc::unbounded_channel();
            *self.created_tx.lock().unwrap() = Some(tx);
            let created = stream::unfold(rx, |mut rx| async move {
                rx.recv().await.map(|item| (item, rx))
            });
            return Ok(scripted.chain(created).boxed());
        }

        match self.end {
            StreamEnd::Close => Ok(scripted.boxed()),
            StreamEnd::Pending => Ok(scripted.chain(stream::pending()).boxed()),
        }
    }

    async fn fetch_logs(
        &self,
        _namespace: &str,
        pod: &str,
        _container: &str,
        sink: &OutputBuffer,
    ) -> Result<()> {
        self.enter("logs", Stage::FetchLogs)?;
        self.fetched.lock().unwrap().push(pod.to_string());
        sink.write(self.logs.as_bytes());
        Ok(())
    }

    async fn delete_pod(&self, namespace: &str, pod: &str) -> Result<()> {
        self.enter("delete", Stage::DeletePod)?;
        self.deleted
            .lock()
            .unwrap()
            .push(format!("{}/{}", namespace, pod));
        Ok(())
    }
}
