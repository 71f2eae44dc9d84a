//! Error taxonomy for the generation pipeline.
//!
//! Trigger-boundary errors (`Validation`, `AlreadyExists`) are returned to
//! the caller before a process exists. Everything else is caught inside the
//! failing stage handler and converted into a `Failed` transition.

use thiserror::Error;

use crate::adapters::BackendError;

/// Errors raised by the pipeline core
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("invalid request: {0}")]
    Validation(String),

    #[error("process already exists: {0}")]
    AlreadyExists(String),

    #[error("process not found: {0}")]
    NotFound(String),

    #[error("no usable candidates from the {stage} stage")]
    NoCandidates { stage: &'static str },

    #[error(transparent)]
    Backend(#[from] BackendError),

    #[error("generated text is not in the requested language '{language}'")]
    LanguageMismatch { language: String },

    #[error("artifact store error: {0}")]
    Artifact(String),
}

impl PipelineError {
    /// Whether this error was rejected at the trigger boundary
    /// (never entered the stage chain).
    pub fn is_rejection(&self) -> bool {
        matches!(self, Self::Validation(_) | Self::AlreadyExists(_))
    }
}
