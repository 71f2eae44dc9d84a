//! Cover-image branch: prompt generation plus synthesis.
//!
//! Consumes `DescriptionReady` in parallel with the compilation branch and
//! never blocks it. Only runs when the process asked for an image; the
//! generated prompt goes to the image backend and the rendered image is
//! stored as an artifact.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, info};

use crate::adapters::{ArtifactKind, ArtifactStore, GenerationBackend, GenerationRequest};
use crate::core::bus::EventHandler;
use crate::core::prompts;
use crate::core::store::ProcessStore;
use crate::domain::{PipelineError, PipelineEvent, ProcessStage};

use super::{expect_text, fail_stage};

/// Handler for the image branch
pub struct ImageStage {
    store: Arc<ProcessStore>,
    text: Arc<dyn GenerationBackend>,
    image: Arc<dyn GenerationBackend>,
    artifacts: Arc<dyn ArtifactStore>,
    timeout: Duration,
}

impl ImageStage {
    pub fn new(
        store: Arc<ProcessStore>,
        text: Arc<dyn GenerationBackend>,
        image: Arc<dyn GenerationBackend>,
        artifacts: Arc<dyn ArtifactStore>,
        timeout: Duration,
    ) -> Self {
        Self {
            store,
            text,
            image,
            artifacts,
            timeout,
        }
    }

    async fn run(
        &self,
        process_id: &str,
        title: &str,
        description: &str,
    ) -> Result<Vec<PipelineEvent>, PipelineError> {
        self.store
            .update_status(process_id, ProcessStage::ImagePromptReady.label(), 92)
            .await;

        let payload = self
            .store
            .payload(process_id)
            .await
            .ok_or_else(|| PipelineError::NotFound(process_id.to_string()))?;

        let request = GenerationRequest::new(prompts::image_prompt_request(
            &payload,
            title,
            description,
        ));
        let prompt = expect_text(self.text.generate(&request, self.timeout).await?)?;

        if prompt.is_empty() {
            return Err(PipelineError::NoCandidates {
                stage: "image prompt",
            });
        }

        let rendered = self
            .image
            .generate(&GenerationRequest::new(prompt.clone()), self.timeout)
            .await?
            .into_bytes();

        let artifact_ref = self
            .artifacts
            .put(process_id, ArtifactKind::Image, rendered)
            .await
            .map_err(|e| PipelineError::Artifact(e.to_string()))?;

        self.store
            .update_status(process_id, ProcessStage::ImagePromptReady.label(), 94)
            .await;

        info!(process_id, artifact_ref = %artifact_ref, "Cover image ready");

        Ok(vec![PipelineEvent::ImagePromptReady {
            process_id: process_id.to_string(),
            prompt,
            artifact_ref,
        }])
    }
}

#[async_trait]
impl EventHandler for ImageStage {
    fn name(&self) -> &'static str {
        "image"
    }

    async fn handle(&self, event: &PipelineEvent) -> Result<Vec<PipelineEvent>, PipelineError> {
        let PipelineEvent::DescriptionReady {
            process_id,
            title,
            description,
            ..
        } = event
        else {
            return Ok(Vec::new());
        };

        if self.store.is_failed(process_id).await {
            debug!(process_id, "Skipping stage for failed process");
            return Ok(Vec::new());
        }

        let wants_image = self
            .store
            .payload(process_id)
            .await
            .map(|p| p.generate_image)
            .unwrap_or(false);
        if !wants_image {
            debug!(process_id, "Image generation not requested");
            return Ok(Vec::new());
        }

        match self.run(process_id, title, description).await {
            Ok(events) => Ok(events),
            Err(e) => {
                Ok(fail_stage(&self.store, process_id, ProcessStage::ImagePromptReady, &e).await)
            }
        }
    }
}
