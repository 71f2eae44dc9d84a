//! Pipeline orchestrator: wiring, per-process lanes and trigger surface.
//!
//! Builds the startup registration table binding stage handlers to the
//! event bus in the fixed stage order, and owns per-process execution
//! serialization: every trigger runs on a spawned task that first takes
//! the process's lane mutex, so at most one stage handler is ever active
//! per process. Cross-process concurrency is bounded by a worker-pool
//! semaphore because every stage makes a network call.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Mutex, Semaphore};
use tokio::task::JoinHandle;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::adapters::{ArtifactStore, GenerationBackend, PushChannel};
use crate::config::ResolvedConfig;
use crate::domain::{
    EventKind, GenerationParams, PayloadField, PipelineError, PipelineEvent, Process,
    ProcessPayload,
};

use super::bus::EventBus;
use super::language::LanguageGate;
use super::notify::NotificationDispatcher;
use super::stages::{
    AudioStage, CompileStage, ContentStage, DescriptionStage, ImageStage, ShortStage, TitleStage,
};
use super::store::ProcessStore;

/// External collaborators the pipeline depends on
pub struct Dependencies {
    pub text: Arc<dyn GenerationBackend>,
    pub speech: Arc<dyn GenerationBackend>,
    pub image: Arc<dyn GenerationBackend>,
    pub artifacts: Arc<dyn ArtifactStore>,
    pub push: Arc<dyn PushChannel>,
}

/// Tuning knobs for the orchestrator
#[derive(Debug, Clone)]
pub struct OrchestratorOptions {
    /// Worker-pool bound for concurrent processes
    pub max_concurrent: usize,

    /// How many title candidates to request
    pub title_count: usize,

    /// Language used when a request omits one, and reference language for
    /// the output-language gate
    pub default_language: String,

    /// Global notification topic
    pub global_topic: String,

    /// Bounded per-call timeout against generation backends
    pub request_timeout: Duration,

    /// Language-gate policy
    pub language_gate: crate::config::LanguageGateSettings,
}

impl Default for OrchestratorOptions {
    fn default() -> Self {
        Self {
            max_concurrent: 4,
            title_count: 5,
            default_language: "pt".to_string(),
            global_topic: "processes".to_string(),
            request_timeout: Duration::from_secs(120),
            language_gate: crate::config::LanguageGateSettings::default(),
        }
    }
}

impl OrchestratorOptions {
    /// Derive options from the resolved configuration
    pub fn from_config(config: &ResolvedConfig) -> Self {
        Self {
            max_concurrent: config.pipeline.max_concurrent,
            title_count: config.pipeline.title_count,
            default_language: config.pipeline.default_language.clone(),
            global_topic: config.pipeline.global_topic.clone(),
            request_timeout: Duration::from_secs(config.backend.request_timeout_seconds),
            language_gate: config.language_gate.clone(),
        }
    }
}

/// A process accepted by `start_process`
#[derive(Debug)]
pub struct StartedProcess {
    pub process_id: String,
    task: JoinHandle<()>,
}

impl StartedProcess {
    /// Wait for the process's event chain to drain
    pub async fn wait(self) {
        let _ = self.task.await;
    }
}

/// Main pipeline orchestrator
pub struct PipelineOrchestrator {
    bus: Arc<EventBus>,
    store: Arc<ProcessStore>,
    lanes: Mutex<HashMap<String, Arc<Mutex<()>>>>,
    permits: Arc<Semaphore>,
    default_language: String,
}

impl PipelineOrchestrator {
    /// Build the orchestrator with its full registration table.
    ///
    /// Registration happens here, once; the table is immutable afterwards.
    pub fn new(store: Arc<ProcessStore>, deps: Dependencies, options: OrchestratorOptions) -> Self {
        let gate = Arc::new(LanguageGate::new(&options.language_gate));
        let timeout = options.request_timeout;

        let notifications = Arc::new(NotificationDispatcher::new(
            deps.push.clone(),
            options.global_topic.clone(),
        ));

        let bus = EventBus::builder()
            .subscribe(
                EventKind::Initiated,
                Arc::new(TitleStage::new(
                    store.clone(),
                    deps.text.clone(),
                    options.title_count,
                    timeout,
                )),
            )
            .subscribe(
                EventKind::TitleSelected,
                Arc::new(ContentStage::new(store.clone(), deps.text.clone(), timeout)),
            )
            .subscribe(
                EventKind::ContentReady,
                Arc::new(ShortStage::new(
                    store.clone(),
                    deps.text.clone(),
                    gate,
                    options.default_language.clone(),
                    timeout,
                )),
            )
            .subscribe(
                EventKind::ShortReady,
                Arc::new(DescriptionStage::new(
                    store.clone(),
                    deps.text.clone(),
                    timeout,
                )),
            )
            .subscribe(
                EventKind::DescriptionReady,
                Arc::new(ImageStage::new(
                    store.clone(),
                    deps.text.clone(),
                    deps.image.clone(),
                    deps.artifacts.clone(),
                    timeout,
                )),
            )
            .subscribe(
                EventKind::DescriptionReady,
                Arc::new(CompileStage::new(store.clone(), deps.artifacts.clone())),
            )
            .subscribe(
                EventKind::Compiled,
                Arc::new(AudioStage::new(
                    store.clone(),
                    deps.speech.clone(),
                    deps.artifacts.clone(),
                    timeout,
                )),
            )
            .subscribe(EventKind::Completed, notifications.clone())
            .subscribe(EventKind::Failed, notifications)
            .build();

        Self {
            bus: Arc::new(bus),
            store,
            lanes: Mutex::new(HashMap::new()),
            permits: Arc::new(Semaphore::new(options.max_concurrent.max(1))),
            default_language: options.default_language,
        }
    }

    /// The per-process lane mutex, created on first use
    async fn lane(&self, process_id: &str) -> Arc<Mutex<()>> {
        let mut lanes = self.lanes.lock().await;
        lanes
            .entry(process_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Run one event chain on the process's lane, bounded by the pool
    async fn dispatch(&self, process_id: &str, event: PipelineEvent) -> JoinHandle<()> {
        let lane = self.lane(process_id).await;
        let bus = self.bus.clone();
        let permits = self.permits.clone();

        tokio::spawn(async move {
            let _lane = lane.lock().await;
            let Ok(_permit) = permits.acquire_owned().await else {
                return;
            };
            bus.publish(event).await;
        })
    }

    /// Create a process and kick off its stage chain.
    ///
    /// Validation and id collisions are rejected here, before anything is
    /// published. The returned handle resolves when the chain has reached
    /// a terminal state.
    #[instrument(skip(self, params), fields(process_id))]
    pub async fn start_process(
        &self,
        process_id: Option<String>,
        params: GenerationParams,
    ) -> Result<StartedProcess, PipelineError> {
        params.validate()?;

        let process_id = process_id.unwrap_or_else(|| Uuid::new_v4().to_string());
        tracing::Span::current().record("process_id", process_id.as_str());

        let payload = ProcessPayload::from_params(&params, &self.default_language);
        self.store.create(&process_id, payload).await?;

        info!(topic = %params.topic, "Process created");

        let task = self
            .dispatch(
                &process_id,
                PipelineEvent::Initiated {
                    process_id: process_id.clone(),
                },
            )
            .await;

        Ok(StartedProcess { process_id, task })
    }

    /// Explicitly select a title, re-triggering the chain from the
    /// selection point on the process's lane.
    #[instrument(skip(self))]
    pub async fn select_title(
        &self,
        process_id: &str,
        title: &str,
    ) -> Result<JoinHandle<()>, PipelineError> {
        let title = title.trim();
        if title.is_empty() {
            return Err(PipelineError::Validation(
                "selected title must be non-empty".to_string(),
            ));
        }

        if self.store.get(process_id).await.is_none() {
            return Err(PipelineError::NotFound(process_id.to_string()));
        }

        self.store
            .set_field(process_id, PayloadField::Title(title.to_string()))
            .await?;

        info!(title, "Title selected");

        Ok(self
            .dispatch(
                process_id,
                PipelineEvent::TitleSelected {
                    process_id: process_id.to_string(),
                    title: title.to_string(),
                },
            )
            .await)
    }

    /// Observable process record
    pub async fn status(&self, process_id: &str) -> Result<Process, PipelineError> {
        self.store
            .get(process_id)
            .await
            .ok_or_else(|| PipelineError::NotFound(process_id.to_string()))
    }

    /// Result reference, `None` while not yet compiled
    pub async fn result(&self, process_id: &str) -> Result<Option<String>, PipelineError> {
        Ok(self.status(process_id).await?.result_ref)
    }

    /// Title candidates generated for a process
    pub async fn titles(&self, process_id: &str) -> Result<Vec<String>, PipelineError> {
        self.store
            .titles(process_id)
            .await
            .ok_or_else(|| PipelineError::NotFound(process_id.to_string()))
    }

    /// All known processes, most recent first
    pub async fn processes(&self) -> Vec<Process> {
        self.store.list().await
    }
}
