//! YouTube caption track source.
//!
//! Retrieves transcripts through YouTube's timedtext endpoint: the watch page
//! embeds a list of caption tracks, and each track URL returns timed events
//! as JSON when asked for the `json3` format.

use super::{Transcript, TranscriptSegment, TranscriptSource};
use crate::error::{OmskrivError, Result};
use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

const WATCH_URL: &str = "https://www.youtube.com/watch";

const USER_AGENT: &str =
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0 Safari/537.36";

/// Transcript source backed by YouTube caption tracks.
pub struct YoutubeTranscriptSource {
    http: reqwest::Client,
    language: String,
}

impl YoutubeTranscriptSource {
    /// Create a source with a preferred caption language and request timeout.
    pub fn new(language: impl Into<String>, timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()?;

        Ok(Self {
            http,
            language: language.into(),
        })
    }

    /// Pick a caption track: preferred language first, human-made tracks over
    /// auto-generated within it, otherwise the first listed track.
    fn select_track<'a>(&self, tracks: &'a [CaptionTrack]) -> Option<&'a CaptionTrack> {
        let preferred: Vec<&'a CaptionTrack> = tracks
            .iter()
            .filter(|t| t.language_code.starts_with(&self.language))
            .collect();

        if let Some(&track) = preferred.iter().find(|t| !t.is_asr()) {
            return Some(track);
        }
        preferred.first().copied().or_else(|| tracks.first())
    }
}

#[async_trait]
impl TranscriptSource for YoutubeTranscriptSource {
    async fn fetch(&self, video_id: &str) -> Result<Transcript> {
        let page = self
            .http
            .get(WATCH_URL)
            .query(&[("v", video_id)])
            .header("Accept-Language", "en-US,en;q=0.9")
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;

        let tracks = extract_caption_tracks(&page)?;
        let track = self.select_track(&tracks).ok_or_else(|| {
            OmskrivError::TranscriptSource(format!("no caption tracks for video {}", video_id))
        })?;
        debug!("Using caption track '{}' for {}", track.language_code, video_id);

        let timed: TimedtextResponse = self
            .http
            .get(&track.base_url)
            .query(&[("fmt", "json3")])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        let segments = timed.into_segments();
        if segments.is_empty() {
            return Err(OmskrivError::TranscriptSource(format!(
                "caption track for video {} contains no text",
                video_id
            )));
        }

        Ok(Transcript::new(video_id.to_string(), segments))
    }
}

/// A caption track entry from the embedded player response.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CaptionTrack {
    base_url: String,
    language_code: String,
    kind: Option<String>,
}

impl CaptionTrack {
    /// Whether this track is auto-generated speech recognition.
    fn is_asr(&self) -> bool {
        self.kind.as_deref() == Some("asr")
    }
}

/// Locate and parse the `captionTracks` array embedded in the watch page.
fn extract_caption_tracks(page: &str) -> Result<Vec<CaptionTrack>> {
    let marker = "\"captionTracks\":";
    let start = page.find(marker).ok_or_else(|| {
        OmskrivError::TranscriptSource(
            "no captions listed on watch page (transcript may be disabled)".to_string(),
        )
    })?;

    let rest = &page[start + marker.len()..];
    let array = json_array_prefix(rest)
        .ok_or_else(|| OmskrivError::TranscriptSource("malformed caption track list".to_string()))?;

    Ok(serde_json::from_str(array)?)
}

/// Return the prefix of `input` holding one complete JSON array.
///
/// Scans with a bracket counter, skipping over string literals and their
/// escape sequences.
fn json_array_prefix(input: &str) -> Option<&str> {
    let bytes = input.as_bytes();
    if bytes.first() != Some(&b'[') {
        return None;
    }

    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (i, &b) in bytes.iter().enumerate() {
        if in_string {
            if escaped {
                escaped = false;
            } else if b == b'\\' {
                escaped = true;
            } else if b == b'"' {
                in_string = false;
            }
            continue;
        }

        match b {
            b'"' => in_string = true,
            b'[' => depth += 1,
            b']' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&input[..=i]);
                }
            }
            _ => {}
        }
    }

    None
}

/// Timedtext response in `json3` format.
#[derive(Debug, Deserialize)]
struct TimedtextResponse {
    #[serde(default)]
    events: Vec<TimedtextEvent>,
}

#[derive(Debug, Deserialize)]
struct TimedtextEvent {
    #[serde(rename = "tStartMs")]
    start_ms: Option<u64>,
    segs: Option<Vec<TimedtextSeg>>,
}

#[derive(Debug, Deserialize)]
struct TimedtextSeg {
    utf8: Option<String>,
}

impl TimedtextResponse {
    /// Flatten events into transcript segments, dropping empty ones.
    fn into_segments(self) -> Vec<TranscriptSegment> {
        let mut segments = Vec::new();

        for event in self.events {
            let segs = match event.segs {
                Some(segs) => segs,
                None => continue,
            };

            let text: String = segs.into_iter().filter_map(|s| s.utf8).collect();
            let text = text.trim().to_string();
            if text.is_empty() {
                continue;
            }

            segments.push(TranscriptSegment {
                text,
                start_seconds: event.start_ms.map(|ms| ms as f64 / 1000.0),
            });
        }

        segments
    }
}
