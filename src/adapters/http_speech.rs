//! HTTP speech-synthesis backend.
//!
//! POSTs text to an OpenAI-compatible audio endpoint and returns the raw
//! audio bytes.

use std::time::Duration;

use async_trait::async_trait;
use tokio::time::timeout;

use super::{BackendError, GenerationBackend, GenerationOutput, GenerationRequest};

/// Speech-synthesis backend over HTTP
pub struct SpeechBackend {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    model: String,
    voice: String,
}

impl SpeechBackend {
    pub fn new(
        base_url: impl Into<String>,
        api_key: Option<String>,
        model: impl Into<String>,
        voice: impl Into<String>,
    ) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
            api_key,
            model: model.into(),
            voice: voice.into(),
        }
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), path)
    }

    fn authorized(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.api_key {
            Some(key) => builder.bearer_auth(key),
            None => builder,
        }
    }

    async fn synthesize(&self, text: &str) -> Result<Vec<u8>, BackendError> {
        let response = self
            .authorized(self.client.post(self.endpoint("v1/audio/speech")))
            .json(&serde_json::json!({
                "model": self.model,
                "voice": self.voice,
                "input": text,
            }))
            .send()
            .await
            .map_err(|e| BackendError::Unavailable(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(BackendError::Rejected(format!(
                "{}: {}",
                status,
                body.trim()
            )));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| BackendError::Unavailable(e.to_string()))?;

        Ok(bytes.to_vec())
    }
}

#[async_trait]
impl GenerationBackend for SpeechBackend {
    fn name(&self) -> &str {
        "speech"
    }

    async fn generate(
        &self,
        request: &GenerationRequest,
        call_timeout: Duration,
    ) -> Result<GenerationOutput, BackendError> {
        let bytes = timeout(call_timeout, self.synthesize(&request.prompt))
            .await
            .map_err(|_| BackendError::Timeout(call_timeout.as_secs()))??;

        Ok(GenerationOutput::Bytes(bytes))
    }

    async fn health_check(&self) -> Result<(), BackendError> {
        let response = self
            .authorized(self.client.get(self.endpoint("v1/models")))
            .send()
            .await
            .map_err(|e| BackendError::Unavailable(e.to_string()))?;

        if !response.status().is_success() {
            return Err(BackendError::Rejected(response.status().to_string()));
        }

        Ok(())
    }
}
