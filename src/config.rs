//! Configuration for the oremus pipeline.
//!
//! Configuration sources (highest priority first):
//! 1. Environment variables (OREMUS_HOME)
//! 2. Config file (.oremus/config.yaml)
//! 3. Defaults (~/.oremus)
//!
//! Config file discovery:
//! - Searches current directory and parents for .oremus/config.yaml
//! - Relative paths in the config file resolve against the config file's
//!   parent directory

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use anyhow::{Context, Result};
use serde::Deserialize;

/// Global cached configuration (stores Result to handle init errors)
static CONFIG: OnceLock<Result<ResolvedConfig, String>> = OnceLock::new();

/// Raw config file schema (matches YAML structure)
#[derive(Debug, Clone, Deserialize)]
pub struct ConfigFile {
    pub version: String,
    #[serde(default)]
    pub paths: PathsConfig,
    #[serde(default)]
    pub backend: Option<BackendConfig>,
    #[serde(default)]
    pub pipeline: Option<PipelineConfig>,
    #[serde(default)]
    pub language_gate: Option<LanguageGateConfig>,
    #[serde(default)]
    pub push: Option<PushConfig>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PathsConfig {
    /// Engine state directory (relative to the config file)
    pub home: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BackendConfig {
    pub base_url: Option<String>,
    pub text_model: Option<String>,
    pub speech_model: Option<String>,
    pub speech_voice: Option<String>,
    pub image_model: Option<String>,
    pub image_size: Option<String>,
    pub request_timeout_seconds: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PipelineConfig {
    pub max_concurrent: Option<usize>,
    pub title_count: Option<usize>,
    pub default_language: Option<String>,
    pub global_topic: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LanguageGateConfig {
    pub min_hits: Option<usize>,
    #[serde(default)]
    pub vocabularies: HashMap<String, Vec<String>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PushConfig {
    pub base_url: Option<String>,
}

/// Resolved configuration with absolute paths and defaults applied
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    /// Absolute path to the oremus home (engine state)
    pub home: PathBuf,
    /// Backend settings
    pub backend: BackendSettings,
    /// Pipeline tuning
    pub pipeline: PipelineSettings,
    /// Language-gate policy parameters
    pub language_gate: LanguageGateSettings,
    /// Push channel settings
    pub push: PushSettings,
    /// Path to the config file (if found)
    pub config_file: Option<PathBuf>,
}

#[derive(Debug, Clone)]
pub struct BackendSettings {
    pub base_url: String,
    pub text_model: String,
    pub speech_model: String,
    pub speech_voice: String,
    pub image_model: String,
    pub image_size: String,
    pub request_timeout_seconds: u64,
}

impl Default for BackendSettings {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080".to_string(),
            text_model: "gpt-4o-mini".to_string(),
            speech_model: "tts-1".to_string(),
            speech_voice: "alloy".to_string(),
            image_model: "dall-e-3".to_string(),
            image_size: "1024x1024".to_string(),
            request_timeout_seconds: 120,
        }
    }
}

#[derive(Debug, Clone)]
pub struct PipelineSettings {
    pub max_concurrent: usize,
    pub title_count: usize,
    pub default_language: String,
    pub global_topic: String,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            max_concurrent: 4,
            title_count: 5,
            default_language: "pt".to_string(),
            global_topic: "processes".to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct LanguageGateSettings {
    pub min_hits: usize,
    /// Extra or overriding function-word vocabularies, keyed by language code
    pub vocabularies: HashMap<String, Vec<String>>,
}

impl Default for LanguageGateSettings {
    fn default() -> Self {
        Self {
            min_hits: 3,
            vocabularies: HashMap::new(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct PushSettings {
    pub base_url: String,
}

impl Default for PushSettings {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8090".to_string(),
        }
    }
}

/// Find config file by searching current directory and parents
fn find_config_file() -> Option<PathBuf> {
    let mut current = std::env::current_dir().ok()?;

    loop {
        let config_path = current.join(".oremus").join("config.yaml");
        if config_path.exists() {
            return Some(config_path);
        }

        if !current.pop() {
            break;
        }
    }

    None
}

/// Load and parse config file
fn load_config_file(path: &Path) -> Result<ConfigFile> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    serde_yaml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))
}

/// Resolve a path that may be relative to the config file's parent
fn resolve_path(base: &Path, path_str: &str) -> PathBuf {
    let path = PathBuf::from(path_str);
    if path.is_absolute() {
        path
    } else {
        base.join(path)
            .canonicalize()
            .unwrap_or_else(|_| base.join(path_str))
    }
}

/// Load configuration from all sources
fn load_config() -> Result<ResolvedConfig> {
    let default_home = dirs::home_dir()
        .context("Failed to determine home directory")?
        .join(".oremus");

    let config_file = find_config_file();

    let file = match config_file {
        Some(ref path) => Some(load_config_file(path)?),
        None => None,
    };

    // Home: env > config file > default
    let home = if let Ok(env_home) = std::env::var("OREMUS_HOME") {
        PathBuf::from(env_home)
    } else if let Some(home_path) = file.as_ref().and_then(|f| f.paths.home.as_deref()) {
        let oremus_dir = config_file
            .as_ref()
            .and_then(|p| p.parent())
            .unwrap_or(Path::new("."));
        resolve_path(oremus_dir, home_path)
    } else {
        default_home
    };

    let mut backend = BackendSettings::default();
    if let Some(b) = file.as_ref().and_then(|f| f.backend.as_ref()) {
        if let Some(ref v) = b.base_url {
            backend.base_url = v.clone();
        }
        if let Some(ref v) = b.text_model {
            backend.text_model = v.clone();
        }
        if let Some(ref v) = b.speech_model {
            backend.speech_model = v.clone();
        }
        if let Some(ref v) = b.speech_voice {
            backend.speech_voice = v.clone();
        }
        if let Some(ref v) = b.image_model {
            backend.image_model = v.clone();
        }
        if let Some(ref v) = b.image_size {
            backend.image_size = v.clone();
        }
        if let Some(v) = b.request_timeout_seconds {
            backend.request_timeout_seconds = v;
        }
    }

    let mut pipeline = PipelineSettings::default();
    if let Some(p) = file.as_ref().and_then(|f| f.pipeline.as_ref()) {
        if let Some(v) = p.max_concurrent {
            pipeline.max_concurrent = v.max(1);
        }
        if let Some(v) = p.title_count {
            pipeline.title_count = v.max(1);
        }
        if let Some(ref v) = p.default_language {
            pipeline.default_language = v.clone();
        }
        if let Some(ref v) = p.global_topic {
            pipeline.global_topic = v.clone();
        }
    }

    let mut language_gate = LanguageGateSettings::default();
    if let Some(g) = file.as_ref().and_then(|f| f.language_gate.as_ref()) {
        if let Some(v) = g.min_hits {
            language_gate.min_hits = v;
        }
        language_gate.vocabularies = g.vocabularies.clone();
    }

    let mut push = PushSettings::default();
    if let Some(p) = file.as_ref().and_then(|f| f.push.as_ref()) {
        if let Some(ref v) = p.base_url {
            push.base_url = v.clone();
        }
    }

    Ok(ResolvedConfig {
        home,
        backend,
        pipeline,
        language_gate,
        push,
        config_file,
    })
}

/// Get the global configuration (loads once, then cached)
pub fn config() -> Result<&'static ResolvedConfig> {
    let result = CONFIG.get_or_init(|| load_config().map_err(|e| e.to_string()));

    match result {
        Ok(config) => Ok(config),
        Err(e) => anyhow::bail!("{}", e),
    }
}

/// Force reload configuration (useful for testing)
pub fn reload_config() -> Result<ResolvedConfig> {
    load_config()
}

// ============================================================================
// Convenience functions
// ============================================================================

/// Get the oremus home directory (engine state)
pub fn oremus_home() -> Result<PathBuf> {
    Ok(config()?.home.clone())
}

/// Get the process snapshot directory ($OREMUS_HOME/processes)
pub fn processes_dir() -> Result<PathBuf> {
    Ok(config()?.home.join("processes"))
}

/// Get the artifact directory ($OREMUS_HOME/artifacts)
pub fn artifacts_dir() -> Result<PathBuf> {
    Ok(config()?.home.join("artifacts"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    #[test]
    fn test_defaults_applied() {
        let backend = BackendSettings::default();
        assert_eq!(backend.request_timeout_seconds, 120);

        let pipeline = PipelineSettings::default();
        assert_eq!(pipeline.default_language, "pt");
        assert_eq!(pipeline.global_topic, "processes");

        let gate = LanguageGateSettings::default();
        assert_eq!(gate.min_hits, 3);
    }

    #[test]
    fn test_config_file_parsing() {
        let temp = TempDir::new().unwrap();
        let oremus_dir = temp.path().join(".oremus");
        std::fs::create_dir_all(&oremus_dir).unwrap();

        let config_path = oremus_dir.join("config.yaml");
        let mut file = std::fs::File::create(&config_path).unwrap();
        writeln!(
            file,
            r#"
version: "1.0"
paths:
  home: ./
backend:
  base_url: http://gen.local
  request_timeout_seconds: 30
pipeline:
  max_concurrent: 8
  default_language: en
language_gate:
  min_hits: 2
  vocabularies:
    fr: ["le", "la", "les", "des", "une"]
push:
  base_url: http://push.local
"#
        )
        .unwrap();

        let config = load_config_file(&config_path).unwrap();
        assert_eq!(config.version, "1.0");
        assert_eq!(
            config.backend.as_ref().unwrap().base_url.as_deref(),
            Some("http://gen.local")
        );
        assert_eq!(config.pipeline.as_ref().unwrap().max_concurrent, Some(8));
        assert_eq!(
            config
                .language_gate
                .as_ref()
                .unwrap()
                .vocabularies
                .get("fr")
                .map(|v| v.len()),
            Some(5)
        );
    }

    #[test]
    fn test_resolve_relative_path() {
        let base = PathBuf::from("/home/user/project");

        assert_eq!(
            resolve_path(&base, "/absolute/path"),
            PathBuf::from("/absolute/path")
        );
        // Relative paths that do not exist fall back to a plain join
        assert_eq!(
            resolve_path(&base, "state"),
            PathBuf::from("/home/user/project/state")
        );
    }
}
