//! Condensed-variant generation with skip policy and language gate.
//!
//! Consumes `ContentReady`, emits `ShortReady`. The stage is skipped
//! (copying the primary text verbatim into the short field) when the
//! requested duration class falls in the short bucket or the process
//! carries an explicit `generate_short = false` flag. Keeping the short
//! field populated keeps the description stage's contract uniform.
//!
//! Generated output goes through a heuristic language check; a mismatch is
//! retried exactly once with a reinforced instruction and the second
//! output is accepted as final either way.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, info, warn};

use crate::adapters::{GenerationBackend, GenerationRequest};
use crate::core::bus::EventHandler;
use crate::core::language::LanguageGate;
use crate::core::prompts;
use crate::core::store::ProcessStore;
use crate::domain::{PayloadField, PipelineError, PipelineEvent, ProcessPayload, ProcessStage};

use super::{expect_text, fail_stage, short_bucket};

/// Handler for the condensed-variant stage
pub struct ShortStage {
    store: Arc<ProcessStore>,
    text: Arc<dyn GenerationBackend>,
    gate: Arc<LanguageGate>,
    default_language: String,
    timeout: Duration,
}

impl ShortStage {
    pub fn new(
        store: Arc<ProcessStore>,
        text: Arc<dyn GenerationBackend>,
        gate: Arc<LanguageGate>,
        default_language: impl Into<String>,
        timeout: Duration,
    ) -> Self {
        Self {
            store,
            text,
            gate,
            default_language: default_language.into(),
            timeout,
        }
    }

    fn should_skip(payload: &ProcessPayload) -> bool {
        payload.generate_short == Some(false) || short_bucket(&payload.duration)
    }

    async fn generate_checked(
        &self,
        process_id: &str,
        payload: &ProcessPayload,
        content: &str,
    ) -> Result<String, PipelineError> {
        let request = GenerationRequest::new(prompts::short_prompt(payload, content));
        let short = expect_text(self.text.generate(&request, self.timeout).await?)?;

        if !self
            .gate
            .mismatch(&short, &payload.language, &self.default_language)
        {
            return Ok(short);
        }

        // One reinforced retry; whatever comes back second is final.
        warn!(
            process_id,
            language = %payload.language,
            "Condensed variant failed the language check, regenerating once"
        );
        let retry =
            GenerationRequest::new(prompts::short_prompt_reinforced(payload, content));
        let short = expect_text(self.text.generate(&retry, self.timeout).await?)?;

        if self
            .gate
            .mismatch(&short, &payload.language, &self.default_language)
        {
            warn!(
                process_id,
                language = %payload.language,
                "Condensed variant still off-language after retry, accepting as-is"
            );
        }

        Ok(short)
    }

    async fn run(
        &self,
        process_id: &str,
        title: &str,
        content: &str,
    ) -> Result<Vec<PipelineEvent>, PipelineError> {
        self.store
            .update_status(process_id, ProcessStage::ShortReady.label(), 75)
            .await;

        let payload = self
            .store
            .payload(process_id)
            .await
            .ok_or_else(|| PipelineError::NotFound(process_id.to_string()))?;

        let short = if Self::should_skip(&payload) {
            debug!(process_id, duration = %payload.duration, "Short variant skipped, copying content");
            content.to_string()
        } else {
            let short = self.generate_checked(process_id, &payload, content).await?;
            if short.is_empty() {
                return Err(PipelineError::NoCandidates { stage: "short" });
            }
            short
        };

        self.store
            .set_field(process_id, PayloadField::ShortContent(short.clone()))
            .await?;
        self.store
            .update_status(process_id, ProcessStage::ShortReady.label(), 80)
            .await;

        info!(process_id, chars = short.len(), "Condensed variant ready");

        Ok(vec![PipelineEvent::ShortReady {
            process_id: process_id.to_string(),
            title: title.to_string(),
            content: content.to_string(),
            short,
        }])
    }
}

#[async_trait]
impl EventHandler for ShortStage {
    fn name(&self) -> &'static str {
        "short"
    }

    async fn handle(&self, event: &PipelineEvent) -> Result<Vec<PipelineEvent>, PipelineError> {
        let PipelineEvent::ContentReady {
            process_id,
            title,
            content,
        } = event
        else {
            return Ok(Vec::new());
        };

        if self.store.is_failed(process_id).await {
            debug!(process_id, "Skipping stage for failed process");
            return Ok(Vec::new());
        }

        match self.run(process_id, title, content).await {
            Ok(events) => Ok(events),
            Err(e) => Ok(fail_stage(&self.store, process_id, ProcessStage::ShortReady, &e).await),
        }
    }
}
