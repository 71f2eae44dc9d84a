//! Compilation of the final document.
//!
//! Consumes `DescriptionReady` (the second branch), assembles the markdown
//! document from the accumulated pieces, stores it and records the result
//! reference. Emits `Compiled` carrying the document text forward for the
//! audio stage.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info};

use crate::adapters::{ArtifactKind, ArtifactStore};
use crate::core::bus::EventHandler;
use crate::core::prompts;
use crate::core::store::ProcessStore;
use crate::domain::{PipelineError, PipelineEvent, ProcessStage};

use super::fail_stage;

/// Handler for the compilation stage
pub struct CompileStage {
    store: Arc<ProcessStore>,
    artifacts: Arc<dyn ArtifactStore>,
}

impl CompileStage {
    pub fn new(store: Arc<ProcessStore>, artifacts: Arc<dyn ArtifactStore>) -> Self {
        Self { store, artifacts }
    }

    async fn run(
        &self,
        process_id: &str,
        title: &str,
        content: &str,
        short: &str,
        description: &str,
    ) -> Result<Vec<PipelineEvent>, PipelineError> {
        self.store
            .update_status(process_id, ProcessStage::Compiled.label(), 70)
            .await;

        let document = prompts::compile_document(title, content, short, description);

        let artifact_ref = self
            .artifacts
            .put(process_id, ArtifactKind::Document, document.clone().into_bytes())
            .await
            .map_err(|e| PipelineError::Artifact(e.to_string()))?;

        self.store.set_result(process_id, &artifact_ref).await?;
        self.store
            .update_status(process_id, ProcessStage::Compiled.label(), 80)
            .await;

        info!(process_id, artifact_ref = %artifact_ref, "Document compiled");

        Ok(vec![PipelineEvent::Compiled {
            process_id: process_id.to_string(),
            artifact_ref,
            document,
        }])
    }
}

#[async_trait]
impl EventHandler for CompileStage {
    fn name(&self) -> &'static str {
        "compile"
    }

    async fn handle(&self, event: &PipelineEvent) -> Result<Vec<PipelineEvent>, PipelineError> {
        let PipelineEvent::DescriptionReady {
            process_id,
            title,
            content,
            short,
            description,
        } = event
        else {
            return Ok(Vec::new());
        };

        if self.store.is_failed(process_id).await {
            debug!(process_id, "Skipping stage for failed process");
            return Ok(Vec::new());
        }

        match self
            .run(process_id, title, content, short, description)
            .await
        {
            Ok(events) => Ok(events),
            Err(e) => Ok(fail_stage(&self.store, process_id, ProcessStage::Compiled, &e).await),
        }
    }
}
