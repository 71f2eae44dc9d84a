//! Command-line interface for oremus.
//!
//! Provides commands for generating prayer content end to end and for
//! querying process status, titles and results across invocations.

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use crate::adapters::{
    ArtifactStore, FsArtifactStore, HttpPushChannel, ImageBackend, SpeechBackend, TextBackend,
};
use crate::core::{Dependencies, OrchestratorOptions, PipelineOrchestrator, ProcessStore};
use crate::domain::{GenerationParams, Process};

/// Environment variable holding the generation backend API key
const API_KEY_ENV: &str = "OREMUS_API_KEY";

/// oremus - Event-driven prayer content generation pipeline
#[derive(Parser, Debug)]
#[command(name = "oremus")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Generate prayer content and wait for completion
    Generate {
        /// Prayer topic
        #[arg(short, long)]
        topic: String,

        /// Writing style
        #[arg(short, long)]
        style: String,

        /// Duration class (e.g., "Padrão", "Short1")
        #[arg(short, long, default_value = "Padrão")]
        duration: String,

        /// Kind of prayer (e.g., morning, evening, intercession)
        #[arg(short, long)]
        kind: String,

        /// Output language code (configured default when omitted)
        #[arg(short, long)]
        language: Option<String>,

        /// Use this title instead of generating candidates
        #[arg(long)]
        title: Option<String>,

        /// Free-text guidance for the generation backends
        #[arg(long)]
        notes: Option<String>,

        /// Also generate a cover image
        #[arg(long)]
        image: bool,

        /// Skip the condensed variant regardless of duration
        #[arg(long)]
        no_short: bool,

        /// Use a specific process id instead of a generated one
        #[arg(long)]
        process_id: Option<String>,
    },

    /// Check the status of a process
    Status {
        /// Process id
        process_id: String,
    },

    /// Show the generated title candidates for a process
    Titles {
        /// Process id
        process_id: String,
    },

    /// Print the compiled result document of a process
    Result {
        /// Process id
        process_id: String,
    },

    /// List recent processes
    Processes {
        /// Maximum number of processes to show
        #[arg(short, long, default_value = "10")]
        limit: usize,
    },

    /// Show resolved configuration (debug)
    Config,
}

impl Cli {
    pub async fn execute(self) -> Result<()> {
        match self.command {
            Commands::Generate {
                topic,
                style,
                duration,
                kind,
                language,
                title,
                notes,
                image,
                no_short,
                process_id,
            } => {
                let params = GenerationParams {
                    topic,
                    style,
                    duration,
                    prayer_kind: kind,
                    language,
                    title,
                    notes,
                    generate_image: image,
                    generate_short: if no_short { Some(false) } else { None },
                };
                generate(process_id, params).await
            }
            Commands::Status { process_id } => status(&process_id).await,
            Commands::Titles { process_id } => titles(&process_id).await,
            Commands::Result { process_id } => result(&process_id).await,
            Commands::Processes { limit } => processes(limit).await,
            Commands::Config => show_config(),
        }
    }
}

/// Build the orchestrator from configuration and real adapters
fn build_orchestrator() -> Result<PipelineOrchestrator> {
    let config = crate::config::config()?;
    let api_key = std::env::var(API_KEY_ENV).ok();

    let base_url = config.backend.base_url.clone();
    let deps = Dependencies {
        text: Arc::new(TextBackend::new(
            base_url.clone(),
            api_key.clone(),
            config.backend.text_model.clone(),
        )),
        speech: Arc::new(SpeechBackend::new(
            base_url.clone(),
            api_key.clone(),
            config.backend.speech_model.clone(),
            config.backend.speech_voice.clone(),
        )),
        image: Arc::new(ImageBackend::new(
            base_url,
            api_key,
            config.backend.image_model.clone(),
            config.backend.image_size.clone(),
        )),
        artifacts: Arc::new(FsArtifactStore::from_config()?),
        push: Arc::new(HttpPushChannel::new(config.push.base_url.clone())),
    };

    let store = Arc::new(ProcessStore::persistent(crate::config::processes_dir()?));

    Ok(PipelineOrchestrator::new(
        store,
        deps,
        OrchestratorOptions::from_config(config),
    ))
}

/// Read-only store over persisted snapshots
fn open_store() -> Result<ProcessStore> {
    Ok(ProcessStore::persistent(crate::config::processes_dir()?))
}

fn print_process(process: &Process) {
    println!("Process:   {}", process.process_id);
    println!("Stage:     {}", process.stage);
    println!("Progress:  {}%", process.progress_percent);
    println!("Started:   {}", process.started_at);
    println!("Updated:   {}", process.last_updated_at);
    println!("Completed: {}", process.completed);
    if let Some(ref result_ref) = process.result_ref {
        println!("Result:    {}", result_ref);
    }
}

async fn generate(process_id: Option<String>, params: GenerationParams) -> Result<()> {
    let orchestrator = build_orchestrator()?;

    let started = orchestrator.start_process(process_id, params).await?;
    let process_id = started.process_id.clone();
    println!("Started process {}", process_id);

    started.wait().await;

    let process = orchestrator.status(&process_id).await?;
    println!();
    print_process(&process);

    if let Some(ref result_ref) = process.result_ref {
        let artifacts = FsArtifactStore::from_config()?;
        if let Some(data) = artifacts.get(result_ref).await? {
            println!("\n{}", String::from_utf8_lossy(&data));
        }
    }

    Ok(())
}

async fn status(process_id: &str) -> Result<()> {
    let store = open_store()?;
    let process = store
        .get(process_id)
        .await
        .with_context(|| format!("Process {} not found", process_id))?;

    print_process(&process);
    Ok(())
}

async fn titles(process_id: &str) -> Result<()> {
    let store = open_store()?;
    let titles = store
        .titles(process_id)
        .await
        .with_context(|| format!("Process {} not found", process_id))?;

    if titles.is_empty() {
        println!("No titles generated yet");
        return Ok(());
    }

    for (i, title) in titles.iter().enumerate() {
        println!("{}. {}", i + 1, title);
    }
    Ok(())
}

async fn result(process_id: &str) -> Result<()> {
    let store = open_store()?;
    let process = store
        .get(process_id)
        .await
        .with_context(|| format!("Process {} not found", process_id))?;

    let Some(ref result_ref) = process.result_ref else {
        println!(
            "No result yet (stage: {}, progress: {}%)",
            process.stage, process.progress_percent
        );
        return Ok(());
    };

    let artifacts = FsArtifactStore::from_config()?;
    let data = artifacts
        .get(result_ref)
        .await?
        .with_context(|| format!("Artifact {} not found", result_ref))?;

    println!("{}", String::from_utf8_lossy(&data));
    Ok(())
}

async fn processes(limit: usize) -> Result<()> {
    let store = open_store()?;
    let processes = store.list().await;

    if processes.is_empty() {
        println!("No processes recorded");
        return Ok(());
    }

    for process in processes.iter().take(limit) {
        let marker = if process.completed {
            "done"
        } else if store.is_failed(&process.process_id).await {
            "failed"
        } else {
            "running"
        };
        println!(
            "{}  [{:>7}] {:>3}%  {}",
            process.process_id, marker, process.progress_percent, process.stage
        );
    }
    Ok(())
}

fn show_config() -> Result<()> {
    let config = crate::config::config()?;

    println!("Home:             {}", config.home.display());
    match config.config_file {
        Some(ref path) => println!("Config file:      {}", path.display()),
        None => println!("Config file:      (none, using defaults)"),
    }
    println!("Backend URL:      {}", config.backend.base_url);
    println!("Text model:       {}", config.backend.text_model);
    println!("Speech model:     {}", config.backend.speech_model);
    println!("Image model:      {}", config.backend.image_model);
    println!(
        "Request timeout:  {}s",
        config.backend.request_timeout_seconds
    );
    println!("Max concurrent:   {}", config.pipeline.max_concurrent);
    println!("Default language: {}", config.pipeline.default_language);
    println!("Global topic:     {}", config.pipeline.global_topic);
    println!("Push URL:         {}", config.push.base_url);
    Ok(())
}
