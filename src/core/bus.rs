//! Typed publish/subscribe event bus.
//!
//! Handlers are registered once at startup through the builder and the
//! registration table is immutable afterwards. `publish` delivers an event
//! to every handler registered for its kind, in registration order, and
//! then drains any follow-up events the handlers emitted, FIFO. A handler
//! failure is contained: it never prevents delivery to sibling handlers or
//! to later events.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, error};

use crate::domain::{EventKind, PipelineEvent, PipelineError};

/// A subscriber for one or more event kinds.
///
/// Handlers return the events they want published next; the bus owns the
/// dispatch loop so per-process ordering is preserved on the publishing
/// task.
#[async_trait]
pub trait EventHandler: Send + Sync {
    /// Stable handler name used in logs
    fn name(&self) -> &'static str;

    /// React to one event and return follow-up events
    async fn handle(&self, event: &PipelineEvent) -> Result<Vec<PipelineEvent>, PipelineError>;
}

/// Builder for the startup registration table
#[derive(Default)]
pub struct EventBusBuilder {
    handlers: HashMap<EventKind, Vec<Arc<dyn EventHandler>>>,
}

impl EventBusBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler for an event kind; order of calls is delivery order
    pub fn subscribe(mut self, kind: EventKind, handler: Arc<dyn EventHandler>) -> Self {
        self.handlers.entry(kind).or_default().push(handler);
        self
    }

    pub fn build(self) -> EventBus {
        EventBus {
            handlers: self.handlers,
        }
    }
}

/// Immutable dispatcher over the registration table
pub struct EventBus {
    handlers: HashMap<EventKind, Vec<Arc<dyn EventHandler>>>,
}

impl EventBus {
    pub fn builder() -> EventBusBuilder {
        EventBusBuilder::new()
    }

    /// Number of handlers registered for a kind
    pub fn handler_count(&self, kind: EventKind) -> usize {
        self.handlers.get(&kind).map(|h| h.len()).unwrap_or(0)
    }

    /// Deliver an event and every follow-up event it produces.
    ///
    /// Returns once the chain triggered by `event` has fully drained.
    pub async fn publish(&self, event: PipelineEvent) {
        let mut queue = VecDeque::new();
        queue.push_back(event);

        while let Some(event) = queue.pop_front() {
            let kind = event.kind();

            let Some(handlers) = self.handlers.get(&kind) else {
                debug!(?kind, process_id = event.process_id(), "No handlers registered");
                continue;
            };

            for handler in handlers {
                match handler.handle(&event).await {
                    Ok(emitted) => queue.extend(emitted),
                    Err(e) => {
                        // Contained: sibling handlers and queued events
                        // still get delivered.
                        error!(
                            handler = handler.name(),
                            ?kind,
                            process_id = event.process_id(),
                            error = %e,
                            "Handler failed"
                        );
                    }
                }
            }
        }
    }
}
