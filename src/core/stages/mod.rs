//! Stage handlers for the generation pipeline.
//!
//! One handler per stage, each consuming the previous stage's event,
//! calling out to a generation backend, updating the process store and
//! emitting the next event. Failures are converted locally into a failed
//! transition plus a `Failed` event; they never escape the handler.

pub mod audio;
pub mod compile;
pub mod content;
pub mod description;
pub mod image;
pub mod short;
pub mod titles;

pub use audio::AudioStage;
pub use compile::CompileStage;
pub use content::ContentStage;
pub use description::DescriptionStage;
pub use image::ImageStage;
pub use short::ShortStage;
pub use titles::TitleStage;

use tracing::error;

use crate::adapters::{BackendError, GenerationOutput};
use crate::domain::{PipelineError, PipelineEvent, ProcessStage};

use super::store::ProcessStore;

/// Duration labels treated as the short bucket (matched case-insensitively
/// as substrings of the requested duration class).
pub(crate) const SHORT_DURATION_LABELS: &[&str] = &["short", "curta"];

/// Whether a duration class falls into the short bucket
pub(crate) fn short_bucket(duration: &str) -> bool {
    let duration = duration.to_lowercase();
    SHORT_DURATION_LABELS
        .iter()
        .any(|label| duration.contains(label))
}

/// Unwrap a textual backend output, trimming surrounding whitespace
pub(crate) fn expect_text(output: GenerationOutput) -> Result<String, PipelineError> {
    output
        .into_text()
        .map(|t| t.trim().to_string())
        .ok_or_else(|| {
            PipelineError::Backend(BackendError::Rejected(
                "expected text output from backend".to_string(),
            ))
        })
}

/// Convert a stage-internal error into the failed transition.
///
/// The stage field carries the diagnostic, progress resets to zero and a
/// single `Failed` event is emitted so observers hear about it. Nothing
/// further is republished for this process.
pub(crate) async fn fail_stage(
    store: &ProcessStore,
    process_id: &str,
    stage: ProcessStage,
    error: &PipelineError,
) -> Vec<PipelineEvent> {
    let diagnostic = format!("{}: {}", stage.label(), error);
    error!(process_id, stage = stage.label(), %error, "Stage failed");

    store.mark_failed(process_id, &diagnostic).await;

    vec![PipelineEvent::Failed {
        process_id: process_id.to_string(),
        stage: stage.label().to_string(),
        message: diagnostic,
    }]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_bucket_matching() {
        assert!(short_bucket("Short1"));
        assert!(short_bucket("SHORT2"));
        assert!(short_bucket("Oração curta"));
        assert!(!short_bucket("Padrão"));
        assert!(!short_bucket("Long"));
    }

    #[test]
    fn test_expect_text_trims() {
        let text = expect_text(GenerationOutput::Text("  amen \n".to_string())).unwrap();
        assert_eq!(text, "amen");
    }

    #[test]
    fn test_expect_text_rejects_binary() {
        let err = expect_text(GenerationOutput::Bytes(vec![0, 1])).unwrap_err();
        assert!(matches!(err, PipelineError::Backend(_)));
    }
}
