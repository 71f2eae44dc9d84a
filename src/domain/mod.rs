//! Domain types for the oremus pipeline.
//!
//! This module contains the core data structures:
//! - Events: immutable stage-to-stage messages
//! - Process / ProcessPayload: per-process state and accumulated artifacts
//! - GenerationParams: validated inbound request
//! - PipelineError: the error taxonomy

pub mod error;
pub mod events;
pub mod process;
pub mod request;

// Re-export commonly used types
pub use error::PipelineError;
pub use events::{EventKind, PipelineEvent};
pub use process::{PayloadField, Process, ProcessPayload, ProcessStage};
pub use request::GenerationParams;
