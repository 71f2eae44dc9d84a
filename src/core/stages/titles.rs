//! Title-candidate generation and automatic selection.
//!
//! Consumes `Initiated`. Emits `TitlesReady` with the ordered candidate
//! list followed by `TitleSelected` for the auto-selected title, so
//! unattended runs proceed without an external selection call.

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

/// Handler for the title-generation stage
pub struct TitleStage {
    store: Arc<ProcessStore>,
    text: Arc<dyn GenerationBackend>,
    title_count: usize,
    timeout: Duration,
}

impl TitleStage {
    pub fn new(
        store: Arc<ProcessStore>,
        text: Arc<dyn GenerationBackend>,
        title_count: usize,
        timeout: Duration,
    ) -> Self {
        Self {
            store,
            text,
            title_count,
            timeout,
        }
    }

    async fn run(&self, process_id: &str) -> Result<Vec<PipelineEvent>, PipelineError> {
        self.store
            .update_status(process_id, ProcessStage::TitlesReady.label(), 20)
            .await;

        let payload = self
            .store
            .payload(process_id)
            .await
            .ok_or_else(|| PipelineError::NotFound(process_id.to_string()))?;

        let titles = match payload.user_title {
            // A user-chosen title short-circuits candidate generation
            Some(ref title) if !title.trim().is_empty() => {
                debug!(process_id, "Using user-supplied title");
                vec![title.trim().to_string()]
            }
            _ => {
                let request =
                    GenerationRequest::new(prompts::title_prompt(&payload, self.title_count));
                let output = self.text.generate(&request, self.timeout).await?;
                prompts::parse_titles(&expect_text(output)?)
            }
        };

        if titles.is_empty() {
            return Err(PipelineError::NoCandidates { stage: "titles" });
        }

        self.store.set_titles(process_id, titles.clone()).await?;

        // Deterministic auto-selection: first candidate in generation order
        let selected = titles[0].clone();
        self.store
            .set_field(process_id, PayloadField::Title(selected.clone()))
            .await?;

        self.store
            .update_status(process_id, ProcessStage::TitleSelected.label(), 45)
            .await;

        info!(process_id, title = %selected, candidates = titles.len(), "Titles ready");

        Ok(vec![
            PipelineEvent::TitlesReady {
                process_id: process_id.to_string(),
                titles,
            },
            PipelineEvent::TitleSelected {
                process_id: process_id.to_string(),
                title: selected,
            },
        ])
    }
}

#[async_trait]
impl EventHandler for TitleStage {
    fn name(&self) -> &'static str {
        "titles"
    }

    async fn handle(&self, event: &PipelineEvent) -> Result<Vec<PipelineEvent>, PipelineError> {
        let PipelineEvent::Initiated { process_id } = event else {
            return Ok(Vec::new());
        };

        if self.store.is_failed(process_id).await {
            debug!(process_id, "Skipping stage for failed process");
            return Ok(Vec::new());
        }

        match self.run(process_id).await {
            Ok(events) => Ok(events),
            Err(e) => Ok(fail_stage(&self.store, process_id, ProcessStage::TitlesReady, &e).await),
        }
    }
}
