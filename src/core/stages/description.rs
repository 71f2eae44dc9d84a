//! Promotional-description generation.
//!
//! Consumes `ShortReady`, emits `DescriptionReady` with all accumulated
//! text fields so the two downstream branches (image, compilation) need no
//! store reads.

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

/// Handler for the description stage
pub struct DescriptionStage {
    store: Arc<ProcessStore>,
    text: Arc<dyn GenerationBackend>,
    timeout: Duration,
}

impl DescriptionStage {
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
        content: &str,
        short: &str,
    ) -> Result<Vec<PipelineEvent>, PipelineError> {
        self.store
            .update_status(process_id, ProcessStage::DescriptionReady.label(), 85)
            .await;

        let payload = self
            .store
            .payload(process_id)
            .await
            .ok_or_else(|| PipelineError::NotFound(process_id.to_string()))?;

        let request =
            GenerationRequest::new(prompts::description_prompt(&payload, title, short));
        let description = expect_text(self.text.generate(&request, self.timeout).await?)?;

        if description.is_empty() {
            return Err(PipelineError::NoCandidates {
                stage: "description",
            });
        }

        self.store
            .set_field(process_id, PayloadField::Description(description.clone()))
            .await?;
        self.store
            .update_status(process_id, ProcessStage::DescriptionReady.label(), 90)
            .await;

        info!(process_id, "Description ready");

        Ok(vec![PipelineEvent::DescriptionReady {
            process_id: process_id.to_string(),
            title: title.to_string(),
            content: content.to_string(),
            short: short.to_string(),
            description,
        }])
    }
}

#[async_trait]
impl EventHandler for DescriptionStage {
    fn name(&self) -> &'static str {
        "description"
    }

    async fn handle(&self, event: &PipelineEvent) -> Result<Vec<PipelineEvent>, PipelineError> {
        let PipelineEvent::ShortReady {
            process_id,
            title,
            content,
            short,
        } = event
        else {
            return Ok(Vec::new());
        };

        if self.store.is_failed(process_id).await {
            debug!(process_id, "Skipping stage for failed process");
            return Ok(Vec::new());
        }

        match self.run(process_id, title, content, short).await {
            Ok(events) => Ok(events),
            Err(e) => {
                Ok(fail_stage(&self.store, process_id, ProcessStage::DescriptionReady, &e).await)
            }
        }
    }
}
