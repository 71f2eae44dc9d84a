//! Inbound generation request parameters and trigger-boundary validation.

use serde::{Deserialize, Serialize};

use super::error::PipelineError;

/// Parameters accepted by the `start_process` trigger
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GenerationParams {
    /// Prayer topic; required
    pub topic: String,

    /// Writing style; required
    pub style: String,

    /// Duration class label; required (e.g., "Padrão", "Short1")
    pub duration: String,

    /// Kind of prayer; required
    pub prayer_kind: String,

    /// Output language code; defaulted when absent
    pub language: Option<String>,

    /// Optional user-chosen title
    pub title: Option<String>,

    /// Optional free-text notes passed through to the backends
    pub notes: Option<String>,

    /// Generate a cover image for this process
    #[serde(default)]
    pub generate_image: bool,

    /// Explicit condensed-variant override; unset lets the duration class decide
    #[serde(default)]
    pub generate_short: Option<bool>,
}

impl GenerationParams {
    /// Validate required fields.
    ///
    /// Rejected requests never create a process.
    pub fn validate(&self) -> Result<(), PipelineError> {
        for (field, value) in [
            ("topic", &self.topic),
            ("style", &self.style),
            ("duration", &self.duration),
            ("prayer_kind", &self.prayer_kind),
        ] {
            if value.trim().is_empty() {
                return Err(PipelineError::Validation(format!(
                    "missing required field '{}'",
                    field
                )));
            }
        }

        if let Some(ref language) = self.language {
            if language.trim().is_empty() {
                return Err(PipelineError::Validation(
                    "language must be non-empty when provided".to_string(),
                ));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid() -> GenerationParams {
        GenerationParams {
            topic: "gratitude".to_string(),
            style: "reflective".to_string(),
            duration: "Padrão".to_string(),
            prayer_kind: "evening".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_valid_params_pass() {
        assert!(valid().validate().is_ok());
    }

    #[test]
    fn test_missing_topic_rejected() {
        let mut params = valid();
        params.topic = "  ".to_string();
        let err = params.validate().unwrap_err();
        assert!(err.to_string().contains("topic"));
    }

    #[test]
    fn test_empty_language_rejected() {
        let mut params = valid();
        params.language = Some(String::new());
        assert!(params.validate().is_err());
    }
}
