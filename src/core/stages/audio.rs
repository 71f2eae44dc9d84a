//! Narration synthesis and terminal completion.
//!
//! Consumes `Compiled`. Narration runs only for full-length duration
//! classes; short-form processes complete directly. Either way the
//! process is forced to the completed state at 100%: a narration failure
//! must never leave an already-compiled document stuck behind a partial
//! progress value. The stage label records the audio diagnostic when that
//! happens.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, info, warn};

use crate::adapters::{ArtifactKind, ArtifactStore, GenerationBackend, GenerationRequest};
use crate::core::bus::EventHandler;
use crate::core::store::ProcessStore;
use crate::domain::{PipelineError, PipelineEvent, ProcessStage};

use super::{fail_stage, short_bucket};

/// Handler for the audio stage
pub struct AudioStage {
    store: Arc<ProcessStore>,
    speech: Arc<dyn GenerationBackend>,
    artifacts: Arc<dyn ArtifactStore>,
    timeout: Duration,
}

impl AudioStage {
    pub fn new(
        store: Arc<ProcessStore>,
        speech: Arc<dyn GenerationBackend>,
        artifacts: Arc<dyn ArtifactStore>,
        timeout: Duration,
    ) -> Self {
        Self {
            store,
            speech,
            artifacts,
            timeout,
        }
    }

    async fn synthesize(&self, process_id: &str, document: &str) -> Result<String, PipelineError> {
        let request = GenerationRequest::new(document.to_string());
        let audio = self
            .speech
            .generate(&request, self.timeout)
            .await?
            .into_bytes();

        self.artifacts
            .put(process_id, ArtifactKind::Audio, audio)
            .await
            .map_err(|e| PipelineError::Artifact(e.to_string()))
    }

    async fn run(
        &self,
        process_id: &str,
        artifact_ref: &str,
        document: &str,
    ) -> Result<Vec<PipelineEvent>, PipelineError> {
        let payload = self
            .store
            .payload(process_id)
            .await
            .ok_or_else(|| PipelineError::NotFound(process_id.to_string()))?;

        // Narration only for full-length content
        let completion_label = if short_bucket(&payload.duration) {
            debug!(process_id, duration = %payload.duration, "Narration skipped for short-form content");
            ProcessStage::Completed.label().to_string()
        } else {
            self.store
                .update_status(process_id, ProcessStage::AudioReady.label(), 85)
                .await;

            match self.synthesize(process_id, document).await {
                Ok(audio_ref) => {
                    info!(process_id, audio_ref = %audio_ref, "Narration ready");
                    ProcessStage::Completed.label().to_string()
                }
                Err(e) => {
                    // Absorbed: the compiled document must stay reachable,
                    // so the process still completes.
                    warn!(process_id, error = %e, "Narration failed, completing without audio");
                    format!("Completed without narration: {}", e)
                }
            }
        };

        self.store
            .mark_completed(process_id, &completion_label)
            .await?;

        info!(process_id, "Process completed");

        Ok(vec![PipelineEvent::Completed {
            process_id: process_id.to_string(),
            artifact_ref: artifact_ref.to_string(),
        }])
    }
}

#[async_trait]
impl EventHandler for AudioStage {
    fn name(&self) -> &'static str {
        "audio"
    }

    async fn handle(&self, event: &PipelineEvent) -> Result<Vec<PipelineEvent>, PipelineError> {
        let PipelineEvent::Compiled {
            process_id,
            artifact_ref,
            document,
        } = event
        else {
            return Ok(Vec::new());
        };

        if self.store.is_failed(process_id).await {
            debug!(process_id, "Skipping stage for failed process");
            return Ok(Vec::new());
        }

        match self.run(process_id, artifact_ref, document).await {
            Ok(events) => Ok(events),
            Err(e) => Ok(fail_stage(&self.store, process_id, ProcessStage::AudioReady, &e).await),
        }
    }
}
