//! Configuration module for Omskriv.
//!
//! Handles loading and managing application settings.

mod settings;

pub use settings::{
    ChunkingSettings, GeneralSettings, ModelSettings, OutputSettings, Settings,
    TranscriptSettings,
};
