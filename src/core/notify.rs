//! Terminal-outcome notification fan-out.
//!
//! Subscribes to the completion and failure events only; intermediate
//! progress stays out of the push channel so observers are not flooded.
//! Every notification goes to the process-specific topic first, then the
//! global topic. Delivery is best-effort: failures are logged, never
//! retried, and never fed back into the pipeline; the authoritative state
//! lives in the process store.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::adapters::{NotificationPayload, PushChannel};
use crate::domain::{PipelineError, PipelineEvent};

use super::bus::EventHandler;

/// Topic carrying events for a single process
pub fn process_topic(process_id: &str) -> String {
    format!("process.{}", process_id)
}

/// Forwards terminal events to the external push channel
pub struct NotificationDispatcher {
    push: Arc<dyn PushChannel>,
    global_topic: String,
}

impl NotificationDispatcher {
    pub fn new(push: Arc<dyn PushChannel>, global_topic: impl Into<String>) -> Self {
        Self {
            push,
            global_topic: global_topic.into(),
        }
    }

    fn payload_for(event: &PipelineEvent) -> Option<NotificationPayload> {
        match event {
            PipelineEvent::Completed {
                process_id,
                artifact_ref,
            } => Some(NotificationPayload {
                process_id: process_id.clone(),
                kind: "completed".to_string(),
                message: "Prayer content generation completed".to_string(),
                result_ref: Some(artifact_ref.clone()),
            }),
            PipelineEvent::Failed {
                process_id,
                message,
                ..
            } => Some(NotificationPayload {
                process_id: process_id.clone(),
                kind: "error".to_string(),
                message: message.clone(),
                result_ref: None,
            }),
            _ => None,
        }
    }
}

#[async_trait]
impl EventHandler for NotificationDispatcher {
    fn name(&self) -> &'static str {
        "notifications"
    }

    async fn handle(&self, event: &PipelineEvent) -> Result<Vec<PipelineEvent>, PipelineError> {
        let Some(payload) = Self::payload_for(event) else {
            return Ok(Vec::new());
        };

        debug!(
            process_id = %payload.process_id,
            kind = %payload.kind,
            "Dispatching notification"
        );

        for topic in [process_topic(&payload.process_id), self.global_topic.clone()] {
            if let Err(e) = self.push.send(&topic, &payload).await {
                warn!(
                    topic = %topic,
                    process_id = %payload.process_id,
                    error = %e,
                    "Notification delivery failed (not retried)"
                );
            }
        }

        Ok(Vec::new())
    }
}
