//! HTTP image-synthesis backend.
//!
//! POSTs a prompt to an OpenAI-compatible image endpoint and decodes the
//! base64 payload into raw image bytes.

use std::time::Duration;

use async_trait::async_trait;
use base64::Engine;
use serde::Deserialize;
use tokio::time::timeout;

use super::{BackendError, GenerationBackend, GenerationOutput, GenerationRequest};

/// Image-synthesis backend over HTTP
pub struct ImageBackend {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    model: String,
    size: String,
}

#[derive(Debug, Deserialize)]
struct ImageResponse {
    data: Vec<ImageDatum>,
}

#[derive(Debug, Deserialize)]
struct ImageDatum {
    b64_json: String,
}

impl ImageBackend {
    pub fn new(
        base_url: impl Into<String>,
        api_key: Option<String>,
        model: impl Into<String>,
        size: impl Into<String>,
    ) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
            api_key,
            model: model.into(),
            size: size.into(),
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

    async fn render(&self, prompt: &str) -> Result<Vec<u8>, BackendError> {
        let response = self
            .authorized(self.client.post(self.endpoint("v1/images/generations")))
            .json(&serde_json::json!({
                "model": self.model,
                "prompt": prompt,
                "size": self.size,
                "response_format": "b64_json",
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

        let parsed: ImageResponse = response
            .json()
            .await
            .map_err(|e| BackendError::Rejected(format!("malformed response: {}", e)))?;

        let datum = parsed
            .data
            .into_iter()
            .next()
            .ok_or_else(|| BackendError::Rejected("empty image response".to_string()))?;

        base64::engine::general_purpose::STANDARD
            .decode(datum.b64_json.as_bytes())
            .map_err(|e| BackendError::Rejected(format!("invalid base64 payload: {}", e)))
    }
}

#[async_trait]
impl GenerationBackend for ImageBackend {
    fn name(&self) -> &str {
        "image"
    }

    async fn generate(
        &self,
        request: &GenerationRequest,
        call_timeout: Duration,
    ) -> Result<GenerationOutput, BackendError> {
        let bytes = timeout(call_timeout, self.render(&request.prompt))
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_join() {
        let backend = ImageBackend::new("http://localhost:8080/", None, "img-1", "1024x1024");
        assert_eq!(
            backend.endpoint("v1/images/generations"),
            "http://localhost:8080/v1/images/generations"
        );
    }
}
