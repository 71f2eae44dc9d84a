//! Core orchestration logic.
//!
//! This module contains:
//! - EventBus: typed publish/subscribe dispatcher
//! - ProcessStore: concurrent per-process state
//! - Stages: one handler per pipeline stage
//! - PipelineOrchestrator: wiring, lanes and triggers
//! - NotificationDispatcher: terminal-outcome fan-out

pub mod bus;
pub mod language;
pub mod notify;
pub mod orchestrator;
pub mod prompts;
pub mod stages;
pub mod store;

// Re-export commonly used types
pub use bus::{EventBus, EventBusBuilder, EventHandler};
pub use language::LanguageGate;
pub use notify::{process_topic, NotificationDispatcher};
pub use orchestrator::{
    Dependencies, OrchestratorOptions, PipelineOrchestrator, StartedProcess,
};
pub use store::ProcessStore;
