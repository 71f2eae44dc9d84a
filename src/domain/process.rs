//! Per-process state and accumulated payload.
//!
//! A `Process` is what external callers observe: stage label, progress,
//! timestamps, completion flag and the result reference. The
//! `ProcessPayload` is the mutable side-record holding request parameters
//! and the intermediate text produced by each stage; it is never exposed
//! directly.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::request::GenerationParams;

/// Canonical pipeline stages, in chain order.
///
/// The stored stage field on a [`Process`] is the label string rather than
/// this enum: once a process fails, the field carries the failure
/// diagnostic instead of a canonical label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessStage {
    Initiated,
    TitlesReady,
    TitleSelected,
    ContentReady,
    ShortReady,
    DescriptionReady,
    ImagePromptReady,
    Compiled,
    AudioReady,
    Completed,
    Failed,
}

impl ProcessStage {
    /// Human-readable stage label stored on the process record
    pub fn label(&self) -> &'static str {
        match self {
            Self::Initiated => "Initiated",
            Self::TitlesReady => "Generating title suggestions",
            Self::TitleSelected => "Title selected",
            Self::ContentReady => "Generating prayer text",
            Self::ShortReady => "Generating condensed version",
            Self::DescriptionReady => "Generating description",
            Self::ImagePromptReady => "Generating cover image",
            Self::Compiled => "Compiling final document",
            Self::AudioReady => "Generating narration audio",
            Self::Completed => "Completed",
            Self::Failed => "Failed",
        }
    }
}

/// Observable state of one pipeline run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Process {
    /// Opaque unique identifier (caller-supplied or generated)
    pub process_id: String,

    /// Current stage label, or the failure diagnostic once failed
    pub stage: String,

    /// 0-100; only reaches 100 on completion
    pub progress_percent: u8,

    /// When the process was created
    pub started_at: DateTime<Utc>,

    /// Updated on every mutation
    pub last_updated_at: DateTime<Utc>,

    /// Terminal success marker
    pub completed: bool,

    /// Reference to the compiled output artifact, set at most once
    pub result_ref: Option<String>,
}

impl Process {
    /// Create a fresh process record in the initiated state
    pub fn new(process_id: String) -> Self {
        let now = Utc::now();
        Self {
            process_id,
            stage: ProcessStage::Initiated.label().to_string(),
            progress_percent: 0,
            started_at: now,
            last_updated_at: now,
            completed: false,
            result_ref: None,
        }
    }
}

/// Accumulated inputs and intermediate artifacts for one process.
///
/// Created atomically with the [`Process`], mutated by exactly the stage
/// handler responsible for producing each field.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessPayload {
    /// Prayer topic (e.g., "gratitude")
    pub topic: String,

    /// Writing style (e.g., "reflective")
    pub style: String,

    /// Requested duration class (e.g., "Padrão", "Short1")
    pub duration: String,

    /// Kind of prayer (e.g., "morning", "intercession")
    pub prayer_kind: String,

    /// BCP-47-ish language code; defaulted when the request omits it
    pub language: String,

    /// Optional user-supplied title (skips candidate generation)
    pub user_title: Option<String>,

    /// Optional free-text guidance for the generation backends
    pub notes: Option<String>,

    /// Whether to generate a cover image
    pub generate_image: bool,

    /// Explicit override for the condensed-variant stage; unset means
    /// the duration class decides
    pub generate_short: Option<bool>,

    /// Selected title (set by the title stage)
    pub title: Option<String>,

    /// Primary prayer text (set by the content stage)
    pub content: Option<String>,

    /// Condensed variant (set by the short stage; copy of `content` when
    /// the stage is skipped)
    pub short_content: Option<String>,

    /// Promotional description (set by the description stage)
    pub description: Option<String>,
}

impl ProcessPayload {
    /// Build the initial payload from validated request parameters
    pub fn from_params(params: &GenerationParams, default_language: &str) -> Self {
        Self {
            topic: params.topic.clone(),
            style: params.style.clone(),
            duration: params.duration.clone(),
            prayer_kind: params.prayer_kind.clone(),
            language: params
                .language
                .clone()
                .unwrap_or_else(|| default_language.to_string()),
            user_title: params.title.clone(),
            notes: params.notes.clone(),
            generate_image: params.generate_image,
            generate_short: params.generate_short,
            title: None,
            content: None,
            short_content: None,
            description: None,
        }
    }
}

/// Selector for the single payload field a stage is allowed to write
#[derive(Debug, Clone)]
pub enum PayloadField {
    Title(String),
    Content(String),
    ShortContent(String),
    Description(String),
}
