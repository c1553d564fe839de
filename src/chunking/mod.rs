//! Word-window chunking for transcripts.
//!
//! Splits normalized text into overlapping windows of whole words so that
//! each piece fits the model's working size while keeping continuity at
//! the seams.

use crate::error::{OmskrivError, Result};
use serde::{Deserialize, Serialize};

/// Parameters for word-window chunking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkSpec {
    /// Maximum words per chunk.
    pub max_words: usize,
    /// Words shared between consecutive chunks.
    pub overlap_words: usize,
}

impl ChunkSpec {
    /// Create a spec, validating the window parameters.
    pub fn new(max_words: usize, overlap_words: usize) -> Result<Self> {
        let spec = Self {
            max_words,
            overlap_words,
        };
        spec.validate()?;
        Ok(spec)
    }

    /// Check that the parameters describe a usable window.
    pub fn validate(&self) -> Result<()> {
        if self.max_words == 0 {
            return Err(OmskrivError::InvalidChunkSpec(
                "max_words must be greater than zero".to_string(),
            ));
        }
        if self.overlap_words >= self.max_words {
            return Err(OmskrivError::InvalidChunkSpec(format!(
                "overlap_words ({}) must be less than max_words ({})",
                self.overlap_words, self.max_words
            )));
        }
        Ok(())
    }

    /// Words the window start advances between consecutive chunks.
    pub fn step(&self) -> usize {
        self.max_words - self.overlap_words
    }
}

impl Default for ChunkSpec {
    fn default() -> Self {
        Self {
            max_words: 300,
            overlap_words: 50,
        }
    }
}

/// A single window of transcript text.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chunk {
    /// Position of this chunk in the document (0-based, contiguous).
    pub index: usize,
    /// Text content of this chunk.
    pub text: String,
    /// Number of words in this chunk.
    pub word_count: usize,
}

/// Split text into overlapping word windows.
///
/// Words are whitespace-delimited tokens with punctuation attached. Each
/// window holds up to `max_words` words and starts `max_words - overlap_words`
/// words after the previous one; the final window takes all remaining words
/// and may be shorter. Splitting stops once a window reaches the last word,
/// so no chunk is ever fully contained in the previous chunk's overlap.
///
/// Deterministic: identical input always yields identical chunks. Empty or
/// whitespace-only text yields no chunks.
pub fn split(text: &str, spec: &ChunkSpec) -> Result<Vec<Chunk>> {
    spec.validate()?;

    let words: Vec<&str> = text.split_whitespace().collect();
    let mut chunks = Vec::new();
    let mut start = 0;

    while start < words.len() {
        let end = (start + spec.max_words).min(words.len());
        let window = &words[start..end];

        chunks.push(Chunk {
            index: chunks.len(),
            text: window.join(" "),
            word_count: window.len(),
        });

        if end == words.len() {
            break;
        }
        start += spec.step();
    }

    Ok(chunks)
}
