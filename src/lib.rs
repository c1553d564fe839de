//! Omskriv - YouTube Transcript Rewriter
//!
//! A local-first CLI tool for fetching YouTube transcripts and rewriting them
//! with a local LLM into clean, readable documents.
//!
//! The name "Omskriv" comes from the Norwegian word for "rewrite."
//!
//! # Overview
//!
//! Omskriv allows you to:
//! - Fetch the caption track of a YouTube video as plain text
//! - Split long transcripts into overlapping word windows
//! - Rewrite each window with a local Ollama model
//! - Assemble the rewritten text into a DOCX or TXT document
//!
//! # Architecture
//!
//! The library is organized into several modules:
//!
//! - `config` - Configuration management
//! - `transcript` - Transcript acquisition (YouTube captions)
//! - `chunking` - Word-window splitting
//! - `model` - Local model client (Ollama)
//! - `pipeline` - Job coordination, retries, progress
//! - `document` - Document assembly and writing
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use omskriv::config::Settings;
//! use omskriv::chunking::ChunkSpec;
//! use omskriv::document::{FsDocumentWriter, OutputFormat};
//! use omskriv::model::OllamaClient;
//! use omskriv::pipeline::{JobParams, PipelineController, RetryPolicy};
//! use omskriv::transcript::{TranscriptFetcher, TranscriptRequest, YoutubeTranscriptSource};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let settings = Settings::load()?;
//!
//!     let source = YoutubeTranscriptSource::new(
//!         settings.transcript.language.clone(),
//!         settings.transcript_timeout(),
//!     )?;
//!     let client = OllamaClient::new(
//!         settings.model.host.clone(),
//!         settings.model.model.clone(),
//!         settings.model_timeout(),
//!     )?;
//!     let writer = FsDocumentWriter::new(settings.output_dir(), true);
//!
//!     let (controller, _events) = PipelineController::new(
//!         TranscriptFetcher::new(Arc::new(source)),
//!         Arc::new(client),
//!         Arc::new(writer),
//!         RetryPolicy::default(),
//!     );
//!
//!     let outcome = controller
//!         .run(JobParams {
//!             request: TranscriptRequest::new(
//!                 "dQw4w9WgXcQ",
//!                 settings.transcript.retry_limit,
//!                 settings.transcript_backoff(),
//!             ),
//!             chunk_spec: ChunkSpec::default(),
//!             prompt: settings.model.prompt.clone(),
//!             title: "My Video".to_string(),
//!             format: OutputFormat::Docx,
//!         })
//!         .await?;
//!     if let Some(path) = outcome.artifact {
//!         println!("Wrote {}", path.display());
//!     }
//!
//!     Ok(())
//! }
//! ```

pub mod chunking;
pub mod cli;
pub mod config;
pub mod document;
pub mod error;
pub mod model;
pub mod pipeline;
pub mod transcript;

pub use error::{OmskrivError, Result};
