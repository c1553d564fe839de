//! Transcript acquisition for Omskriv.
//!
//! Provides the request/result types, a trait-based interface for transcript
//! sources, and a retrying fetcher that wraps a source.

mod fetcher;
mod youtube;

pub use fetcher::TranscriptFetcher;
pub use youtube::YoutubeTranscriptSource;

use crate::error::Result;
use async_trait::async_trait;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// A request to fetch a transcript.
#[derive(Debug, Clone)]
pub struct TranscriptRequest {
    /// Video URL or bare video ID.
    pub reference: String,
    /// Retries after the first failed attempt.
    pub retry_limit: u32,
    /// Delay between attempts.
    pub retry_backoff: Duration,
}

impl TranscriptRequest {
    pub fn new(reference: impl Into<String>, retry_limit: u32, retry_backoff: Duration) -> Self {
        Self {
            reference: reference.into(),
            retry_limit,
            retry_backoff,
        }
    }
}

/// A single timed line of a transcript.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriptSegment {
    /// Text content.
    pub text: String,
    /// Offset from the start of the video in seconds, when the source has timing.
    pub start_seconds: Option<f64>,
}

/// A fetched transcript.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transcript {
    /// Video ID this transcript belongs to.
    pub video_id: String,
    /// Individual transcript lines in order.
    pub segments: Vec<TranscriptSegment>,
    /// Full transcript text with whitespace normalized.
    pub text: String,
}

impl Transcript {
    /// Create a transcript from segments, computing the normalized full text.
    pub fn new(video_id: String, segments: Vec<TranscriptSegment>) -> Self {
        let joined = segments
            .iter()
            .map(|s| s.text.as_str())
            .collect::<Vec<_>>()
            .join(" ");
        let text = normalize_whitespace(&joined);

        Self {
            video_id,
            segments,
            text,
        }
    }

    /// Number of words in the normalized text.
    pub fn word_count(&self) -> usize {
        self.text.split_whitespace().count()
    }
}

/// Collapse whitespace runs to single spaces and trim the ends.
pub fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Trait for transcript providers.
#[async_trait]
pub trait TranscriptSource: Send + Sync {
    /// Fetch the transcript for a video ID.
    async fn fetch(&self, video_id: &str) -> Result<Transcript>;
}

/// Extract a video ID from a YouTube URL or bare ID.
pub fn parse_video_reference(input: &str) -> Option<String> {
    // Matches various YouTube URL formats and bare video IDs
    let video_id_regex = Regex::new(
        r"(?x)
        (?:
            # Full YouTube URLs
            (?:https?://)?
            (?:www\.)?
            (?:youtube\.com/watch\?v=|youtu\.be/|youtube\.com/embed/|youtube\.com/v/)
            ([a-zA-Z0-9_-]{11})
        )
        |
        # Bare video ID (11 characters)
        ^([a-zA-Z0-9_-]{11})$
    ",
    )
    .expect("Invalid regex");

    let caps = video_id_regex.captures(input.trim())?;

    // Try group 1 (URL format) then group 2 (bare ID)
    caps.get(1)
        .or_else(|| caps.get(2))
        .map(|m| m.as_str().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_video_reference() {
        // Test various URL formats
        assert_eq!(
            parse_video_reference("https://www.youtube.com/watch?v=dQw4w9WgXcQ"),
            Some("dQw4w9WgXcQ".to_string())
        );
        assert_eq!(
            parse_video_reference("https://youtu.be/dQw4w9WgXcQ"),
            Some("dQw4w9WgXcQ".to_string())
        );
        assert_eq!(
            parse_video_reference("https://youtube.com/embed/dQw4w9WgXcQ"),
            Some("dQw4w9WgXcQ".to_string())
        );
        assert_eq!(
            parse_video_reference("youtube.com/v/dQw4w9WgXcQ"),
            Some("dQw4w9WgXcQ".to_string())
        );
        assert_eq!(
            parse_video_reference("dQw4w9WgXcQ"),
            Some("dQw4w9WgXcQ".to_string())
        );

        // Extra query parameters after the ID are fine
        assert_eq!(
            parse_video_reference("https://www.youtube.com/watch?v=dQw4w9WgXcQ&t=42s"),
            Some("dQw4w9WgXcQ".to_string())
        );

        // Test invalid inputs
        assert_eq!(parse_video_reference("not-a-video-id"), None);
        assert_eq!(parse_video_reference("https://example.com/watch?v=dQw4w9WgXcQ"), None);
        assert_eq!(parse_video_reference(""), None);
    }

    #[test]
    fn test_normalize_whitespace() {
        assert_eq!(normalize_whitespace("  hello   world \n"), "hello world");
        assert_eq!(normalize_whitespace("one\ttwo\nthree"), "one two three");
        assert_eq!(normalize_whitespace("   "), "");
    }

    #[test]
    fn test_transcript_normalizes_text() {
        let transcript = Transcript::new(
            "test".to_string(),
            vec![
                TranscriptSegment {
                    text: "first\nline ".to_string(),
                    start_seconds: Some(0.0),
                },
                TranscriptSegment {
                    text: "  second line".to_string(),
                    start_seconds: Some(2.5),
                },
            ],
        );

        assert_eq!(transcript.text, "first line second line");
        assert_eq!(transcript.word_count(), 4);
    }
}
