//! Pipeline events.
//!
//! Events are immutable once constructed. Every variant carries the
//! process id plus the data the next stage needs: title and prayer text
//! flow forward through several stages so handlers do not have to re-read
//! the store where freshness matters.

use serde::{Deserialize, Serialize};

/// A tagged union over stage-specific payload shapes
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "event")]
pub enum PipelineEvent {
    /// A new process was created and the chain should start
    Initiated { process_id: String },

    /// Title candidates were generated (ordered, never empty)
    TitlesReady {
        process_id: String,
        titles: Vec<String>,
    },

    /// A title was chosen (auto-selected or user-selected)
    TitleSelected { process_id: String, title: String },

    /// Primary prayer text is available
    ContentReady {
        process_id: String,
        title: String,
        content: String,
    },

    /// Condensed variant is available (copy of the content when skipped)
    ShortReady {
        process_id: String,
        title: String,
        content: String,
        short: String,
    },

    /// Promotional description is available
    DescriptionReady {
        process_id: String,
        title: String,
        content: String,
        short: String,
        description: String,
    },

    /// Cover image prompt generated and image synthesized
    ImagePromptReady {
        process_id: String,
        prompt: String,
        artifact_ref: String,
    },

    /// Final document compiled and stored
    Compiled {
        process_id: String,
        artifact_ref: String,
        document: String,
    },

    /// Terminal: the process finished successfully
    Completed {
        process_id: String,
        artifact_ref: String,
    },

    /// Terminal: the process failed at some stage
    Failed {
        process_id: String,
        stage: String,
        message: String,
    },
}

impl PipelineEvent {
    /// The process this event belongs to
    pub fn process_id(&self) -> &str {
        match self {
            Self::Initiated { process_id }
            | Self::TitlesReady { process_id, .. }
            | Self::TitleSelected { process_id, .. }
            | Self::ContentReady { process_id, .. }
            | Self::ShortReady { process_id, .. }
            | Self::DescriptionReady { process_id, .. }
            | Self::ImagePromptReady { process_id, .. }
            | Self::Compiled { process_id, .. }
            | Self::Completed { process_id, .. }
            | Self::Failed { process_id, .. } => process_id,
        }
    }

    /// Discriminant used as the subscription key on the event bus
    pub fn kind(&self) -> EventKind {
        match self {
            Self::Initiated { .. } => EventKind::Initiated,
            Self::TitlesReady { .. } => EventKind::TitlesReady,
            Self::TitleSelected { .. } => EventKind::TitleSelected,
            Self::ContentReady { .. } => EventKind::ContentReady,
            Self::ShortReady { .. } => EventKind::ShortReady,
            Self::DescriptionReady { .. } => EventKind::DescriptionReady,
            Self::ImagePromptReady { .. } => EventKind::ImagePromptReady,
            Self::Compiled { .. } => EventKind::Compiled,
            Self::Completed { .. } => EventKind::Completed,
            Self::Failed { .. } => EventKind::Failed,
        }
    }

    /// Whether this event ends the chain for its process
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed { .. } | Self::Failed { .. })
    }
}

/// Event type discriminant for handler registration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    Initiated,
    TitlesReady,
    TitleSelected,
    ContentReady,
    ShortReady,
    DescriptionReady,
    ImagePromptReady,
    Compiled,
    Completed,
    Failed,
}
