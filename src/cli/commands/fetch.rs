//! Fetch command implementation.

use crate::cli::Output;
use crate::config::Settings;
use crate::transcript::{
    TranscriptFetcher, TranscriptRequest, TranscriptSegment, YoutubeTranscriptSource,
};
use anyhow::Result;
use serde::Serialize;
use std::sync::Arc;

/// Exportable transcript with metadata.
#[derive(Debug, Serialize)]
struct ExportedTranscript {
    video_id: String,
    word_count: usize,
    segment_count: usize,
    text: String,
    segments: Vec<TranscriptSegment>,
}

/// Run the fetch command.
pub async fn run_fetch(
    input: &str,
    output: Option<String>,
    format: &str,
    settings: Settings,
) -> Result<()> {
    let source = YoutubeTranscriptSource::new(
        settings.transcript.language.clone(),
        settings.transcript_timeout(),
    )?;
    let fetcher = TranscriptFetcher::new(Arc::new(source));
    let request = TranscriptRequest::new(
        input,
        settings.transcript.retry_limit,
        settings.transcript_backoff(),
    );

    let spinner = Output::spinner("Fetching transcript...");
    let fetched = fetcher.fetch(&request).await;
    spinner.finish_and_clear();

    let transcript = match fetched {
        Ok(transcript) => transcript,
        Err(e) => {
            Output::error(&format!("{}", e));
            return Err(e.into());
        }
    };

    let output_str = match format {
        "json" => {
            let export = ExportedTranscript {
                video_id: transcript.video_id.clone(),
                word_count: transcript.word_count(),
                segment_count: transcript.segments.len(),
                text: transcript.text.clone(),
                segments: transcript.segments.clone(),
            };
            serde_json::to_string_pretty(&export)?
        }
        "text" => transcript.text.clone(),
        other => {
            return Err(anyhow::anyhow!("Unknown format: {}. Use text or json.", other));
        }
    };

    match output {
        Some(path) if path != "-" => {
            std::fs::write(&path, &output_str)?;
            Output::success(&format!(
                "Transcript for {} saved to {} ({} words)",
                transcript.video_id,
                path,
                transcript.word_count()
            ));
        }
        _ => {
            println!("{}", output_str);
        }
    }

    Ok(())
}
