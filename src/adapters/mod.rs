//! Adapter interfaces for external systems.
//!
//! The pipeline core talks to three kinds of collaborators through these
//! traits: generation backends (text, speech, image), the artifact store,
//! and the push channel used for client-facing status notifications.

pub mod fs_store;
pub mod http_image;
pub mod http_speech;
pub mod http_text;
pub mod push;

use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use fs_store::FsArtifactStore;
pub use http_image::ImageBackend;
pub use http_speech::SpeechBackend;
pub use http_text::TextBackend;
pub use push::HttpPushChannel;

/// Failures surfaced by a generation backend
#[derive(Debug, Clone, Error)]
pub enum BackendError {
    /// The backend could not be reached
    #[error("backend unavailable: {0}")]
    Unavailable(String),

    /// The backend received the request and refused it
    #[error("backend rejected request: {0}")]
    Rejected(String),

    /// The bounded per-call timeout elapsed
    #[error("backend call timed out after {0}s")]
    Timeout(u64),
}

/// A request to a generation backend
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    /// Instruction describing what to generate
    pub prompt: String,
}

impl GenerationRequest {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
        }
    }
}

/// Output produced by a generation backend
#[derive(Debug, Clone)]
pub enum GenerationOutput {
    Text(String),
    Bytes(Vec<u8>),
}

impl GenerationOutput {
    /// Text content, if this output is textual
    pub fn into_text(self) -> Option<String> {
        match self {
            Self::Text(text) => Some(text),
            Self::Bytes(_) => None,
        }
    }

    /// Raw bytes regardless of output shape
    pub fn into_bytes(self) -> Vec<u8> {
        match self {
            Self::Text(text) => text.into_bytes(),
            Self::Bytes(bytes) => bytes,
        }
    }
}

/// Trait for generation backends (text completion, speech and image synthesis)
#[async_trait]
pub trait GenerationBackend: Send + Sync {
    /// Human-readable backend name
    fn name(&self) -> &str;

    /// Execute one generation call, bounded by `timeout`
    async fn generate(
        &self,
        request: &GenerationRequest,
        timeout: Duration,
    ) -> Result<GenerationOutput, BackendError>;

    /// Cheap reachability probe
    async fn health_check(&self) -> Result<(), BackendError>;
}

/// Kinds of stored artifacts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactKind {
    /// Compiled markdown document
    Document,

    /// Synthesized narration audio
    Audio,

    /// Synthesized cover image
    Image,
}

impl ArtifactKind {
    /// File extension used by filesystem stores
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Document => "md",
            Self::Audio => "mp3",
            Self::Image => "png",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Document => "document",
            Self::Audio => "audio",
            Self::Image => "image",
        }
    }
}

/// Opaque storage for generated artifacts
#[async_trait]
pub trait ArtifactStore: Send + Sync {
    /// Store an artifact and return its opaque reference
    async fn put(&self, process_id: &str, kind: ArtifactKind, data: Vec<u8>) -> Result<String>;

    /// Fetch an artifact by reference; `None` when unknown
    async fn get(&self, artifact_ref: &str) -> Result<Option<Vec<u8>>>;
}

/// Message delivered to notification topics
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationPayload {
    /// The process this notification is about
    pub process_id: String,

    /// Fixed type tag: "completed" or "error"
    pub kind: String,

    /// Human-readable summary
    pub message: String,

    /// Result reference, present only on completion
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result_ref: Option<String>,
}

/// Fire-and-forget topic-addressed push channel
#[async_trait]
pub trait PushChannel: Send + Sync {
    async fn send(&self, topic: &str, message: &NotificationPayload) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_text_accessors() {
        let output = GenerationOutput::Text("amen".to_string());
        assert_eq!(output.clone().into_text().as_deref(), Some("amen"));
        assert_eq!(output.into_bytes(), b"amen");

        let binary = GenerationOutput::Bytes(vec![1, 2, 3]);
        assert!(binary.clone().into_text().is_none());
        assert_eq!(binary.into_bytes(), vec![1, 2, 3]);
    }

    #[test]
    fn test_artifact_kind_extensions() {
        assert_eq!(ArtifactKind::Document.extension(), "md");
        assert_eq!(ArtifactKind::Audio.extension(), "mp3");
        assert_eq!(ArtifactKind::Image.extension(), "png");
    }

    #[test]
    fn test_notification_payload_omits_absent_result() {
        let payload = NotificationPayload {
            process_id: "p1".to_string(),
            kind: "error".to_string(),
            message: "failed".to_string(),
            result_ref: None,
        };
        let json = serde_json::to_string(&payload).unwrap();
        assert!(!json.contains("result_ref"));
    }
}
