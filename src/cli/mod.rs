//! CLI module for Omskriv.

pub mod commands;
mod output;
pub mod preflight;

pub use output::Output;

use clap::{Parser, Subcommand};

/// Omskriv - YouTube Transcript Rewriter
///
/// A local-first CLI tool for fetching YouTube transcripts and rewriting them
/// with a local LLM into clean, readable documents.
/// The name "Omskriv" comes from the Norwegian word for "rewrite."
#[derive(Parser, Debug)]
#[command(name = "omskriv")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Increase verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Path to configuration file
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Fetch a transcript, rewrite it with the model, and write a document
    Run {
        /// YouTube URL or bare video ID
        input: String,

        /// Output file path (default: derived from the title in the output directory)
        #[arg(short, long)]
        output: Option<String>,

        /// Output document format (docx, txt)
        #[arg(short, long)]
        format: Option<String>,

        /// Document title (default: the video ID)
        #[arg(short, long)]
        title: Option<String>,

        /// Processing instruction applied to every chunk
        #[arg(short, long)]
        prompt: Option<String>,

        /// Ollama model to generate with
        #[arg(short, long)]
        model: Option<String>,

        /// Maximum words per chunk
        #[arg(long)]
        max_words: Option<usize>,

        /// Words shared between consecutive chunks
        #[arg(long)]
        overlap_words: Option<usize>,
    },

    /// Fetch and print a transcript without rewriting it
    Fetch {
        /// YouTube URL or bare video ID
        input: String,

        /// Output file (stdout if not specified)
        #[arg(short, long)]
        output: Option<String>,

        /// Output format (text, json)
        #[arg(long, default_value = "text")]
        format: String,
    },

    /// Check system requirements and configuration
    Doctor,

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Open configuration file in editor
    Edit,

    /// Show configuration file path
    Path,
}
