//! Chunk processing pipeline.
//!
//! Coordinates transcript fetching, chunk splitting, per-chunk model
//! transformation, and document assembly, reporting progress through an
//! event channel.

mod controller;

pub use controller::PipelineController;

use crate::chunking::ChunkSpec;
use crate::document::OutputFormat;
use crate::transcript::TranscriptRequest;
use std::path::PathBuf;
use std::time::Duration;
use uuid::Uuid;

/// Lifecycle states of a pipeline job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobState {
    Idle,
    Fetching,
    Splitting,
    Processing,
    Assembling,
    Completed,
    Cancelled,
    Failed,
}

impl JobState {
    /// Whether this state ends the job.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            JobState::Completed | JobState::Cancelled | JobState::Failed
        )
    }
}

impl std::fmt::Display for JobState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            JobState::Idle => "idle",
            JobState::Fetching => "fetching",
            JobState::Splitting => "splitting",
            JobState::Processing => "processing",
            JobState::Assembling => "assembling",
            JobState::Completed => "completed",
            JobState::Cancelled => "cancelled",
            JobState::Failed => "failed",
        };
        write!(f, "{}", name)
    }
}

/// Per-chunk processing status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChunkStatus {
    Pending,
    InFlight,
    Done,
    Failed,
    Cancelled,
}

impl std::fmt::Display for ChunkStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ChunkStatus::Pending => "pending",
            ChunkStatus::InFlight => "in-flight",
            ChunkStatus::Done => "done",
            ChunkStatus::Failed => "failed",
            ChunkStatus::Cancelled => "cancelled",
        };
        write!(f, "{}", name)
    }
}

/// A chunk travelling through the pipeline.
#[derive(Debug, Clone)]
pub struct ProcessedChunk {
    /// Position in the document.
    pub index: usize,
    /// Original chunk text.
    pub source_text: String,
    /// Model output once Done, or the source text after permanent failure.
    pub transformed_text: Option<String>,
    /// Current status.
    pub status: ChunkStatus,
}

impl ProcessedChunk {
    fn pending(index: usize, source_text: String) -> Self {
        Self {
            index,
            source_text,
            transformed_text: None,
            status: ChunkStatus::Pending,
        }
    }

    /// Text that represents this chunk in the assembled document.
    pub fn output_text(&self) -> &str {
        self.transformed_text
            .as_deref()
            .unwrap_or(&self.source_text)
    }
}

/// Retry policy for per-chunk model calls.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Retries after the first failed attempt.
    pub max_retries: u32,
    /// Constant delay between attempts.
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 2,
            backoff: Duration::from_secs(1),
        }
    }
}

/// Inputs for a pipeline run.
#[derive(Debug, Clone)]
pub struct JobParams {
    /// Transcript to fetch, with its retry policy.
    pub request: TranscriptRequest,
    /// Chunk window parameters.
    pub chunk_spec: ChunkSpec,
    /// Processing instruction applied to every chunk.
    pub prompt: String,
    /// Document title.
    pub title: String,
    /// Output document format.
    pub format: OutputFormat,
}

/// A single pipeline execution.
#[derive(Debug, Clone)]
pub struct Job {
    /// Unique job ID.
    pub id: Uuid,
    /// Inputs this job was started with.
    pub params: JobParams,
    /// Chunks in document order.
    pub chunks: Vec<ProcessedChunk>,
    /// Current lifecycle state.
    pub state: JobState,
    /// Error description once Failed.
    pub error: Option<String>,
}

impl Job {
    fn new(params: JobParams) -> Self {
        Self {
            id: Uuid::new_v4(),
            params,
            chunks: Vec::new(),
            state: JobState::Idle,
            error: None,
        }
    }

    /// Count of chunks currently holding the given status.
    pub fn count_with_status(&self, status: ChunkStatus) -> usize {
        self.chunks.iter().filter(|c| c.status == status).count()
    }
}

/// Result of a finished pipeline run.
#[derive(Debug)]
pub struct JobOutcome {
    /// The job with its final state and chunk results.
    pub job: Job,
    /// Written document path when the job completed.
    pub artifact: Option<PathBuf>,
}

/// Progress notification emitted by the controller.
///
/// Events are emitted in order, each after the transition it describes.
#[derive(Debug, Clone)]
pub enum ProgressEvent {
    /// The job moved to a new lifecycle state.
    StateChanged { job_id: Uuid, state: JobState },
    /// Splitting finished; `total` chunks will be processed.
    ChunksPlanned { job_id: Uuid, total: usize },
    /// A chunk changed status. `text` carries the transformed text on Done.
    ChunkUpdated {
        job_id: Uuid,
        index: usize,
        status: ChunkStatus,
        text: Option<String>,
    },
}
