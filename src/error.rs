//! Error types for Omskriv.

use thiserror::Error;

/// Library-level error type for Omskriv operations.
#[derive(Error, Debug)]
pub enum OmskrivError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid video reference: {0}")]
    InvalidReference(String),

    #[error("Transcript unavailable after {attempts} attempt(s): {last_error}")]
    TranscriptUnavailable { attempts: u32, last_error: String },

    #[error("Transcript source error: {0}")]
    TranscriptSource(String),

    #[error("Invalid chunk spec: {0}")]
    InvalidChunkSpec(String),

    #[error("Model unavailable: {0}")]
    ModelUnavailable(String),

    #[error("Operation cancelled")]
    Cancelled,

    #[error("Assembly failed: {0}")]
    Assembly(String),

    #[error("Document write failed: {0}")]
    Write(String),

    #[error("External tool not found: {0}. Please install it and ensure it's in your PATH.")]
    ToolNotFound(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

/// Result type alias for Omskriv operations.
pub type Result<T> = std::result::Result<T, OmskrivError>;
