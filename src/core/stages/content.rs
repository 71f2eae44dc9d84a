//! Primary prayer-text generation.
//!
//! Consumes `TitleSelected`, emits `ContentReady` carrying the title and
//! the generated text forward.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, info};

use crate::adapters::{GenerationBackend, GenerationRequest};
use crate::core::bus::EventHandler;
use crate::core::prompts;
use crate::core::store::ProcessStore;
use crate::domain::{PayloadField, PipelineError, PipelineEvent, ProcessStage};

use super::{expect_text, fail_stage};

/// Handler for the content-generation stage
pub struct ContentStage {
    store: Arc<ProcessStore>,
    text: Arc<dyn GenerationBackend>,
    timeout: Duration,
}

impl ContentStage {
    pub fn new(
        store: Arc<ProcessStore>,
        text: Arc<dyn GenerationBackend>,
        timeout: Duration,
    ) -> Self {
        Self {
            store,
            text,
            timeout,
        }
    }

    async fn run(
        &self,
        process_id: &str,
        title: &str,
    ) -> Result<Vec<PipelineEvent>, PipelineError> {
        self.store
            .update_status(process_id, ProcessStage::ContentReady.label(), 50)
            .await;

        // Persist the selection this stage is reacting to; a user-made
        // selection overrides the auto-selected candidate.
        self.store
            .set_field(process_id, PayloadField::Title(title.to_string()))
            .await?;

        let payload = self
            .store
            .payload(process_id)
            .await
            .ok_or_else(|| PipelineError::NotFound(process_id.to_string()))?;

        let request = GenerationRequest::new(prompts::content_prompt(&payload, title));
        let content = expect_text(self.text.generate(&request, self.timeout).await?)?;

        if content.is_empty() {
            return Err(PipelineError::NoCandidates { stage: "content" });
        }

        self.store
            .set_field(process_id, PayloadField::Content(content.clone()))
            .await?;
        self.store
            .update_status(process_id, ProcessStage::ContentReady.label(), 70)
            .await;

        info!(process_id, chars = content.len(), "Prayer text ready");

        Ok(vec![PipelineEvent::ContentReady {
            process_id: process_id.to_string(),
            title: title.to_string(),
            content,
        }])
    }
}

#[async_trait]
impl EventHandler for ContentStage {
    fn name(&self) -> &'static str {
        "content"
    }

    async fn handle(&self, event: &PipelineEvent) -> Result<Vec<PipelineEvent>, PipelineError> {
        let PipelineEvent::TitleSelected { process_id, title } = event else {
            return Ok(Vec::new());
        };

        if self.store.is_failed(process_id).await {
            debug!(process_id, "Skipping stage for failed process");
            return Ok(Vec::new());
        }

        match self.run(process_id, title).await {
            Ok(events) => Ok(events),
            Err(e) => Ok(fail_stage(&self.store, process_id, ProcessStage::ContentReady, &e).await),
        }
    }
}
