//! Topic-addressed HTTP push channel.
//!
//! Delivers notification payloads by POSTing JSON to
//! `<base>/topics/<topic>`. Delivery is fire-and-forget from the caller's
//! point of view; errors are surfaced so the dispatcher can log them.

use anyhow::{Context, Result};
use async_trait::async_trait;

use super::{NotificationPayload, PushChannel};

/// Push channel over HTTP
pub struct HttpPushChannel {
    client: reqwest::Client,
    base_url: String,
}

impl HttpPushChannel {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
        }
    }

    fn topic_url(&self, topic: &str) -> String {
        format!("{}/topics/{}", self.base_url.trim_end_matches('/'), topic)
    }
}

#[async_trait]
impl PushChannel for HttpPushChannel {
    async fn send(&self, topic: &str, message: &NotificationPayload) -> Result<()> {
        let url = self.topic_url(topic);

        let response = self
            .client
            .post(&url)
            .json(message)
            .send()
            .await
            .with_context(|| format!("Failed to push notification to {}", url))?;

        if !response.status().is_success() {
            anyhow::bail!(
                "Push channel returned {} for topic '{}'",
                response.status(),
                topic
            );
        }

        Ok(())
    }
}
