//! HTTP text-generation backend.
//!
//! Talks to an OpenAI-compatible chat-completions endpoint. The per-call
//! timeout is enforced here so a stalled backend can never block a process
//! lane indefinitely.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tokio::time::timeout;

use super::{BackendError, GenerationBackend, GenerationOutput, GenerationRequest};

/// Text-completion backend over HTTP
pub struct TextBackend {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    model: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    content: String,
}

impl TextBackend {
    pub fn new(base_url: impl Into<String>, api_key: Option<String>, model: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
            api_key,
            model: model.into(),
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

    async fn complete(&self, prompt: &str) -> Result<String, BackendError> {
        let response = self
            .authorized(self.client.post(self.endpoint("v1/chat/completions")))
            .json(&serde_json::json!({
                "model": self.model,
                "messages": [{"role": "user", "content": prompt}],
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

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| BackendError::Rejected(format!("malformed response: {}", e)))?;

        let content = parsed
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .unwrap_or_default();

        Ok(content)
    }
}

#[async_trait]
impl GenerationBackend for TextBackend {
    fn name(&self) -> &str {
        "text"
    }

    async fn generate(
        &self,
        request: &GenerationRequest,
        call_timeout: Duration,
    ) -> Result<GenerationOutput, BackendError> {
        let content = timeout(call_timeout, self.complete(&request.prompt))
            .await
            .map_err(|_| BackendError::Timeout(call_timeout.as_secs()))??;

        Ok(GenerationOutput::Text(content))
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_join() {
        let backend = TextBackend::new("http://localhost:8080/", None, "test-model");
        assert_eq!(
            backend.endpoint("v1/chat/completions"),
            "http://localhost:8080/v1/chat/completions"
        );
    }

    #[tokio::test]
    async fn test_unreachable_backend_is_unavailable() {
        // Port 9 (discard) is not listening; the connect error must map to
        // Unavailable, not a panic or a timeout.
        let backend = TextBackend::new("http://127.0.0.1:9", None, "test-model");
        let err = backend
            .generate(&GenerationRequest::new("hello"), Duration::from_secs(5))
            .await
            .unwrap_err();
        assert!(matches!(err, BackendError::Unavailable(_)));
    }
}
