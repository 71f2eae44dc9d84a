#![allow(dead_code)]
//! Shared test doubles for the pipeline integration tests.
//!
//! The scripted text backend routes on distinctive fragments of each
//! stage's instruction so tests can control every stage independently and
//! assert on per-stage call counts.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::Result as AnyResult;
use async_trait::async_trait;

use oremus::adapters::{
    ArtifactKind, ArtifactStore, BackendError, GenerationBackend, GenerationOutput,
    GenerationRequest, NotificationPayload, PushChannel,
};
use oremus::core::{Dependencies, OrchestratorOptions, PipelineOrchestrator, ProcessStore};
use oremus::domain::GenerationParams;

pub const DEFAULT_TITLES: &str = "Morning Light\nQuiet Gratitude\nStill Waters";
pub const DEFAULT_CONTENT: &str =
    "Agradecemos por tudo que recebemos, para que a paz esteja com todos, \
     não apenas hoje mas por toda a vida, como uma bênção para nós.";
pub const DEFAULT_SHORT: &str = "Agradecemos por tudo que recebemos, com paz para nós.";
pub const DEFAULT_DESCRIPTION: &str = "Uma oração breve sobre gratidão, para começar o dia.";
pub const DEFAULT_IMAGE_PROMPT: &str = "A serene sunrise over still water, soft golden light.";

/// Which stage a text-backend prompt belongs to
pub fn classify(prompt: &str) -> &'static str {
    if prompt.contains("one title per line") {
        "titles"
    } else if prompt.contains("Return only the prayer text") {
        "content"
    } else if prompt.contains("Condense the following prayer") {
        "short"
    } else if prompt.contains("description for a published prayer") {
        "description"
    } else if prompt.contains("visual prompt") {
        "image_prompt"
    } else {
        "unknown"
    }
}

/// Scripted text backend with per-stage responses and call counting
pub struct MockText {
    responses: Mutex<HashMap<&'static str, Vec<String>>>,
    calls: Mutex<Vec<String>>,
    /// Prompts containing any of these markers fail with `Unavailable`
    fail_markers: Vec<String>,
}

impl MockText {
    pub fn new() -> Self {
        let mut responses: HashMap<&'static str, Vec<String>> = HashMap::new();
        responses.insert("titles", vec![DEFAULT_TITLES.to_string()]);
        responses.insert("content", vec![DEFAULT_CONTENT.to_string()]);
        responses.insert("short", vec![DEFAULT_SHORT.to_string()]);
        responses.insert("description", vec![DEFAULT_DESCRIPTION.to_string()]);
        responses.insert("image_prompt", vec![DEFAULT_IMAGE_PROMPT.to_string()]);

        Self {
            responses: Mutex::new(responses),
            calls: Mutex::new(Vec::new()),
            fail_markers: Vec::new(),
        }
    }

    /// Replace the response for one stage (all calls get the same answer)
    pub fn respond(self, stage: &'static str, response: &str) -> Self {
        self.responses
            .lock()
            .unwrap()
            .insert(stage, vec![response.to_string()]);
        self
    }

    /// Queue successive responses for one stage (later calls pop forward)
    pub fn respond_sequence(self, stage: &'static str, responses: &[&str]) -> Self {
        self.responses
            .lock()
            .unwrap()
            .insert(stage, responses.iter().map(|s| s.to_string()).collect());
        self
    }

    /// Fail any prompt that mentions this marker
    pub fn fail_when_prompt_contains(mut self, marker: &str) -> Self {
        self.fail_markers.push(marker.to_string());
        self
    }

    /// Number of calls routed to a stage
    pub fn calls_for(&self, stage: &'static str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|p| classify(p) == stage)
            .count()
    }

    /// All recorded prompts, in call order
    pub fn prompts(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl GenerationBackend for MockText {
    fn name(&self) -> &str {
        "mock-text"
    }

    async fn generate(
        &self,
        request: &GenerationRequest,
        _timeout: Duration,
    ) -> Result<GenerationOutput, BackendError> {
        self.calls.lock().unwrap().push(request.prompt.clone());

        if self
            .fail_markers
            .iter()
            .any(|marker| request.prompt.contains(marker))
        {
            return Err(BackendError::Unavailable("scripted failure".to_string()));
        }

        let stage = classify(&request.prompt);
        let mut responses = self.responses.lock().unwrap();
        let queue = responses.entry(stage).or_default();

        let response = if queue.len() > 1 {
            queue.remove(0)
        } else {
            queue.first().cloned().unwrap_or_default()
        };

        Ok(GenerationOutput::Text(response))
    }

    async fn health_check(&self) -> Result<(), BackendError> {
        Ok(())
    }
}

/// Binary backend (speech or image) that succeeds or always fails
pub struct MockBinary {
    label: &'static str,
    calls: Mutex<usize>,
    fail: bool,
}

impl MockBinary {
    pub fn ok(label: &'static str) -> Self {
        Self {
            label,
            calls: Mutex::new(0),
            fail: false,
        }
    }

    pub fn failing(label: &'static str) -> Self {
        Self {
            label,
            calls: Mutex::new(0),
            fail: true,
        }
    }

    pub fn calls(&self) -> usize {
        *self.calls.lock().unwrap()
    }
}

#[async_trait]
impl GenerationBackend for MockBinary {
    fn name(&self) -> &str {
        self.label
    }

    async fn generate(
        &self,
        _request: &GenerationRequest,
        _timeout: Duration,
    ) -> Result<GenerationOutput, BackendError> {
        *self.calls.lock().unwrap() += 1;

        if self.fail {
            return Err(BackendError::Rejected("scripted failure".to_string()));
        }

        Ok(GenerationOutput::Bytes(vec![0xAA, 0xBB, 0xCC]))
    }

    async fn health_check(&self) -> Result<(), BackendError> {
        Ok(())
    }
}

/// In-memory artifact store
#[derive(Default)]
pub struct MemoryArtifacts {
    items: Mutex<HashMap<String, Vec<u8>>>,
}

impl MemoryArtifacts {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.items.lock().unwrap().len()
    }
}

#[async_trait]
impl ArtifactStore for MemoryArtifacts {
    async fn put(&self, process_id: &str, kind: ArtifactKind, data: Vec<u8>) -> AnyResult<String> {
        let mut items = self.items.lock().unwrap();
        let reference = format!("{}/{}-{}", process_id, kind.as_str(), items.len());
        items.insert(reference.clone(), data);
        Ok(reference)
    }

    async fn get(&self, artifact_ref: &str) -> AnyResult<Option<Vec<u8>>> {
        Ok(self.items.lock().unwrap().get(artifact_ref).cloned())
    }
}

/// Push channel that records every send
#[derive(Default)]
pub struct MemoryPush {
    sent: Mutex<Vec<(String, NotificationPayload)>>,
}

impl MemoryPush {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sent(&self) -> Vec<(String, NotificationPayload)> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl PushChannel for MemoryPush {
    async fn send(&self, topic: &str, message: &NotificationPayload) -> AnyResult<()> {
        self.sent
            .lock()
            .unwrap()
            .push((topic.to_string(), message.clone()));
        Ok(())
    }
}

/// Push channel that always fails
pub struct BrokenPush;

#[async_trait]
impl PushChannel for BrokenPush {
    async fn send(&self, _topic: &str, _message: &NotificationPayload) -> AnyResult<()> {
        anyhow::bail!("push channel down")
    }
}

/// Everything a test needs to drive and observe a pipeline
pub struct Harness {
    pub orchestrator: PipelineOrchestrator,
    pub store: Arc<ProcessStore>,
    pub text: Arc<MockText>,
    pub speech: Arc<MockBinary>,
    pub image: Arc<MockBinary>,
    pub artifacts: Arc<MemoryArtifacts>,
    pub push: Arc<MemoryPush>,
}

impl Harness {
    /// Recorded text-backend prompts routed to one stage, in call order
    pub fn prompts_for(&self, stage: &'static str) -> Vec<String> {
        self.text
            .prompts()
            .into_iter()
            .filter(|p| classify(p) == stage)
            .collect()
    }
}

/// Build an orchestrator over mock collaborators
pub fn harness(text: MockText) -> Harness {
    harness_with(text, MockBinary::ok("speech"))
}

pub fn harness_with(text: MockText, speech: MockBinary) -> Harness {
    let store = Arc::new(ProcessStore::in_memory());
    let text = Arc::new(text);
    let speech = Arc::new(speech);
    let image = Arc::new(MockBinary::ok("image"));
    let artifacts = Arc::new(MemoryArtifacts::new());
    let push = Arc::new(MemoryPush::new());

    let deps = Dependencies {
        text: text.clone(),
        speech: speech.clone(),
        image: image.clone(),
        artifacts: artifacts.clone(),
        push: push.clone(),
    };

    let orchestrator =
        PipelineOrchestrator::new(store.clone(), deps, OrchestratorOptions::default());

    Harness {
        orchestrator,
        store,
        text,
        speech,
        image,
        artifacts,
        push,
    }
}

/// Valid params for a full-length Portuguese process
pub fn params(topic: &str) -> GenerationParams {
    GenerationParams {
        topic: topic.to_string(),
        style: "reflective".to_string(),
        duration: "Padrão".to_string(),
        prayer_kind: "morning".to_string(),
        language: Some("pt".to_string()),
        ..Default::default()
    }
}
