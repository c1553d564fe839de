//! Retrying transcript fetcher.

use super::{parse_video_reference, Transcript, TranscriptRequest, TranscriptSource};
use crate::error::{OmskrivError, Result};
use std::sync::Arc;
use tracing::{debug, instrument, warn};

/// Fetches transcripts with reference validation and constant-backoff retry.
///
/// Stateless across invocations: every call validates the reference, then
/// delegates retrieval to the underlying source.
pub struct TranscriptFetcher {
    source: Arc<dyn TranscriptSource>,
}

impl TranscriptFetcher {
    pub fn new(source: Arc<dyn TranscriptSource>) -> Self {
        Self { source }
    }

    /// Fetch a transcript, retrying failed attempts.
    ///
    /// The reference is validated before any attempt; an unparseable reference
    /// fails immediately with `InvalidReference`. Source errors are all treated
    /// as transient: the fetch is retried up to `retry_limit` more times with
    /// `retry_backoff` between attempts, then gives up with
    /// `TranscriptUnavailable` carrying the last underlying error.
    #[instrument(skip(self, request), fields(reference = %request.reference))]
    pub async fn fetch(&self, request: &TranscriptRequest) -> Result<Transcript> {
        let video_id = parse_video_reference(&request.reference).ok_or_else(|| {
            OmskrivError::InvalidReference(format!(
                "not a recognizable YouTube URL or video ID: {}",
                request.reference
            ))
        })?;

        let attempts = request.retry_limit + 1;
        let mut last_error = String::new();

        for attempt in 1..=attempts {
            if attempt > 1 {
                tokio::time::sleep(request.retry_backoff).await;
            }

            match self.source.fetch(&video_id).await {
                Ok(transcript) => {
                    debug!(
                        "Fetched transcript for {} ({} segments, {} words)",
                        video_id,
                        transcript.segments.len(),
                        transcript.word_count()
                    );
                    return Ok(transcript);
                }
                Err(e) => {
                    warn!("Transcript fetch attempt {}/{} failed: {}", attempt, attempts, e);
                    last_error = e.to_string();
                }
            }
        }

        Err(OmskrivError::TranscriptUnavailable {
            attempts,
            last_error,
        })
    }
}
