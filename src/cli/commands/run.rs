//! Run command implementation.

use crate::chunking::ChunkSpec;
use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::Settings;
use crate::document::{FsDocumentWriter, OutputFormat};
use crate::model::OllamaClient;
use crate::pipeline::{
    ChunkStatus, JobParams, JobState, PipelineController, ProgressEvent, RetryPolicy,
};
use crate::transcript::{
    parse_video_reference, TranscriptFetcher, TranscriptRequest, YoutubeTranscriptSource,
};
use anyhow::Result;
use indicatif::ProgressBar;
use std::sync::Arc;
use tokio::sync::mpsc;

/// Run the full pipeline: fetch, chunk, rewrite, assemble.
pub async fn run_pipeline(
    input: &str,
    output: Option<String>,
    format: Option<String>,
    title: Option<String>,
    prompt: Option<String>,
    model: Option<String>,
    max_words: Option<usize>,
    overlap_words: Option<usize>,
    settings: Settings,
) -> Result<()> {
    // Flags override config
    let format: OutputFormat = format
        .as_deref()
        .unwrap_or(&settings.output.format)
        .parse()
        .map_err(|e: String| anyhow::anyhow!(e))?;

    if format == OutputFormat::Docx {
        if let Err(e) = preflight::check(Operation::RenderDocx) {
            Output::error(&format!("{}", e));
            Output::info("Run 'omskriv doctor' for detailed diagnostics.");
            return Err(e.into());
        }
    }

    let chunk_spec = ChunkSpec::new(
        max_words.unwrap_or(settings.chunking.max_words),
        overlap_words.unwrap_or(settings.chunking.overlap_words),
    )?;

    let video_id = parse_video_reference(input)
        .ok_or_else(|| anyhow::anyhow!("Not a YouTube URL or video ID: {}", input))?;

    let title = match title {
        Some(t) if !t.trim().is_empty() => t,
        _ if !settings.output.title.trim().is_empty() => settings.output.title.clone(),
        _ => video_id.clone(),
    };
    let prompt = prompt.unwrap_or_else(|| settings.model.prompt.clone());
    let model_name = model.unwrap_or_else(|| settings.model.model.clone());

    let source = YoutubeTranscriptSource::new(
        settings.transcript.language.clone(),
        settings.transcript_timeout(),
    )?;
    let fetcher = TranscriptFetcher::new(Arc::new(source));

    let client = OllamaClient::new(
        settings.model.host.clone(),
        model_name.clone(),
        settings.model_timeout(),
    )?;

    // Probe the server before any network or model work
    let spinner = Output::spinner("Checking Ollama server...");
    let version = client.version().await;
    spinner.finish_and_clear();
    match version {
        Ok(version) => {
            Output::info(&format!(
                "Ollama {} at {} (model: {})",
                version, settings.model.host, model_name
            ));
        }
        Err(e) => {
            Output::error(&format!("{}", e));
            Output::info("Run 'omskriv doctor' for detailed diagnostics.");
            return Err(e.into());
        }
    }

    let mut writer = FsDocumentWriter::new(settings.output_dir(), settings.output.include_title);
    if let Some(path) = output {
        writer = writer.with_path(Settings::expand_path(&path));
    }

    let retry = RetryPolicy {
        max_retries: settings.model.retry_limit,
        backoff: settings.model_backoff(),
    };
    let (controller, events) =
        PipelineController::new(fetcher, Arc::new(client), Arc::new(writer), retry);

    // Ctrl-C requests cooperative cancellation
    let cancel = controller.cancel_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            Output::warning("Cancelling...");
            cancel.cancel();
        }
    });

    Output::info(&format!("Processing: {}", input));
    let renderer = tokio::spawn(render_progress(events));

    let params = JobParams {
        request: TranscriptRequest::new(
            input,
            settings.transcript.retry_limit,
            settings.transcript_backoff(),
        ),
        chunk_spec,
        prompt,
        title,
        format,
    };

    let result = controller.run(params).await;
    let _ = renderer.await;

    match result {
        Ok(outcome) => {
            if outcome.job.state == JobState::Cancelled {
                Output::warning("Cancelled. No document was written.");
                return Ok(());
            }

            let failed = outcome.job.count_with_status(ChunkStatus::Failed);
            if failed > 0 {
                Output::warning(&format!(
                    "{} of {} chunks kept their original text",
                    failed,
                    outcome.job.chunks.len()
                ));
            }
            if let Some(artifact) = &outcome.artifact {
                let done = outcome.job.count_with_status(ChunkStatus::Done);
                Output::success(&format!(
                    "Document written to {} ({} chunks rewritten)",
                    artifact.display(),
                    done
                ));
            }
            Ok(())
        }
        Err(e) => {
            Output::error(&format!("Failed: {}", e));
            Err(e.into())
        }
    }
}

/// Render progress events until the job reaches a terminal state.
async fn render_progress(mut events: mpsc::UnboundedReceiver<ProgressEvent>) {
    let mut bar: Option<ProgressBar> = None;
    let mut spinner: Option<ProgressBar> = None;

    while let Some(event) = events.recv().await {
        match event {
            ProgressEvent::StateChanged { state, .. } => {
                if state.is_terminal() {
                    if let Some(sp) = spinner.take() {
                        sp.finish_and_clear();
                    }
                    if let Some(pb) = bar.take() {
                        pb.finish_and_clear();
                    }
                    break;
                }
                match state {
                    JobState::Fetching => {
                        spinner = Some(Output::spinner("Fetching transcript..."));
                    }
                    JobState::Splitting => {
                        if let Some(sp) = spinner.take() {
                            sp.finish_and_clear();
                        }
                    }
                    JobState::Assembling => {
                        if let Some(pb) = bar.take() {
                            pb.finish_and_clear();
                        }
                        spinner = Some(Output::spinner("Assembling document..."));
                    }
                    _ => {}
                }
            }
            ProgressEvent::ChunksPlanned { total, .. } => {
                bar = Some(Output::progress_bar(total as u64, "Rewriting chunks"));
            }
            ProgressEvent::ChunkUpdated { status, .. } => {
                if let Some(pb) = &bar {
                    match status {
                        ChunkStatus::Done | ChunkStatus::Failed => pb.inc(1),
                        _ => {}
                    }
                }
            }
        }
    }

    if let Some(sp) = spinner {
        sp.finish_and_clear();
    }
    if let Some(pb) = bar {
        pb.finish_and_clear();
    }
}
