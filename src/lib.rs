//! oremus - Event-driven prayer content generation pipeline
//!
//! Given a topic and a small set of parameters, oremus drives a chain of
//! generation stages (title candidates, prayer text, a condensed variant,
//! a promotional description, an optional cover image, a compiled document
//! and optional narration), each stage consuming the previous stage's
//! event and calling an external generative backend.
//!
//! # Architecture
//!
//! - A typed event bus delivers each stage's event to the handlers
//!   registered for it at startup; handler failures are contained.
//! - A concurrent process store tracks per-process stage, progress and
//!   accumulated payload fields, linearizable per process id.
//! - The orchestrator serializes each process onto its own lane and
//!   bounds cross-process concurrency with a worker pool.
//! - Terminal outcomes fan out to a topic-addressed push channel.
//!
//! # Modules
//!
//! - `adapters`: generation backends, artifact store, push channel
//! - `core`: bus, store, stages, orchestrator, notifications
//! - `domain`: events, process state, request parameters, errors
//! - `cli`: command-line interface
//!
//! # Usage
//!
//! ```bash
//! # Generate prayer content end to end
//! oremus generate --topic gratitude --style reflective --duration Padrão --kind morning
//!
//! # Check process status
//! oremus status <process-id>
//! ```

pub mod adapters;
pub mod cli;
pub mod config;
pub mod core;
pub mod domain;

// Re-export main types at crate root for convenience
pub use crate::core::{PipelineOrchestrator, ProcessStore};
pub use crate::domain::{GenerationParams, PipelineError, PipelineEvent, Process, ProcessStage};
