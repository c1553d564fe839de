//! Configuration settings for Omskriv.

use crate::model::DEFAULT_HOST;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
#[derive(Default)]
pub struct Settings {
    pub general: GeneralSettings,
    pub transcript: TranscriptSettings,
    pub chunking: ChunkingSettings,
    pub model: ModelSettings,
    pub output: OutputSettings,
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralSettings {
    /// Directory where documents are written.
    pub output_dir: String,
}

impl Default for GeneralSettings {
    fn default() -> Self {
        Self {
            output_dir: "~/Documents/omskriv".to_string(),
        }
    }
}

/// Transcript fetching settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TranscriptSettings {
    /// Preferred caption language code (e.g. "en", "en-US").
    pub language: String,
    /// Retries after the first failed fetch attempt.
    pub retry_limit: u32,
    /// Seconds to wait between fetch attempts.
    pub retry_backoff_secs: u64,
    /// HTTP timeout for transcript requests, in seconds.
    pub timeout_secs: u64,
}

impl Default for TranscriptSettings {
    fn default() -> Self {
        Self {
            language: "en".to_string(),
            retry_limit: 3,
            retry_backoff_secs: 1,
            timeout_secs: 30,
        }
    }
}

/// Chunk window settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkingSettings {
    /// Maximum words per chunk.
    pub max_words: usize,
    /// Words shared between consecutive chunks.
    pub overlap_words: usize,
}

impl Default for ChunkingSettings {
    fn default() -> Self {
        Self {
            max_words: 300,
            overlap_words: 50,
        }
    }
}

/// Local model settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelSettings {
    /// Base URL of the Ollama server.
    pub host: String,
    /// Model name to generate with.
    pub model: String,
    /// Processing instruction applied to every chunk.
    pub prompt: String,
    /// HTTP timeout for generation requests, in seconds.
    pub timeout_secs: u64,
    /// Retries after the first failed call for a chunk.
    pub retry_limit: u32,
    /// Seconds to wait between call attempts.
    pub retry_backoff_secs: u64,
}

impl Default for ModelSettings {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            model: "deepseek-r1".to_string(),
            prompt: "Check and reformat the text for grammar, clarity, and proper structure."
                .to_string(),
            timeout_secs: 120,
            retry_limit: 2,
            retry_backoff_secs: 1,
        }
    }
}

/// Output document settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputSettings {
    /// Document format (docx, txt).
    pub format: String,
    /// Document title. Empty means use the video ID.
    pub title: String,
    /// Render the title as a heading in the document.
    pub include_title: bool,
}

impl Default for OutputSettings {
    fn default() -> Self {
        Self {
            format: "docx".to_string(),
            title: String::new(),
            include_title: true,
        }
    }
}

impl Settings {
    /// Load settings from the default configuration file.
    pub fn load() -> crate::error::Result<Self> {
        Self::load_from(None)
    }

    /// Load settings from a specific path, or default location if None.
    pub fn load_from(path: Option<&PathBuf>) -> crate::error::Result<Self> {
        let config_path = match path {
            Some(p) => p.clone(),
            None => Self::default_config_path(),
        };

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            let settings: Settings = toml::from_str(&content)?;
            Ok(settings)
        } else {
            Ok(Settings::default())
        }
    }

    /// Save settings to the default configuration file.
    pub fn save(&self) -> crate::error::Result<()> {
        self.save_to(&Self::default_config_path())
    }

    /// Save settings to a specific path.
    pub fn save_to(&self, path: &PathBuf) -> crate::error::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)
            .map_err(|e| crate::error::OmskrivError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Get the default configuration file path.
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("omskriv")
            .join("config.toml")
    }

    /// Expand shell variables in paths (e.g., ~).
    pub fn expand_path(path: &str) -> PathBuf {
        PathBuf::from(shellexpand::tilde(path).to_string())
    }

    /// Get the expanded output directory path.
    pub fn output_dir(&self) -> PathBuf {
        Self::expand_path(&self.general.output_dir)
    }

    /// Timeout for transcript requests.
    pub fn transcript_timeout(&self) -> Duration {
        Duration::from_secs(self.transcript.timeout_secs)
    }

    /// Backoff between transcript fetch attempts.
    pub fn transcript_backoff(&self) -> Duration {
        Duration::from_secs(self.transcript.retry_backoff_secs)
    }

    /// Timeout for model generation requests.
    pub fn model_timeout(&self) -> Duration {
        Duration::from_secs(self.model.timeout_secs)
    }

    /// Backoff between model call attempts.
    pub fn model_backoff(&self) -> Duration {
        Duration::from_secs(self.model.retry_backoff_secs)
    }
}
