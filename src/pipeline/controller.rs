use crate::chunking;
use crate::document::DocumentWriter;
use crate::error::{OmskrivError, Result};
use crate::model::ModelClient;
use crate::pipeline::{
    ChunkStatus, Job, JobOutcome, JobParams, JobState, ProcessedChunk, ProgressEvent, RetryPolicy,
};
use crate::transcript::TranscriptFetcher;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

/// Separator between chunk outputs in the assembled document body.
const CHUNK_SEPARATOR: &str = "\n\n";

/// Drives a job through fetch, split, transform, and assembly.
///
/// Progress is reported on the event channel returned by [`Self::new`].
/// The controller never blocks on the receiver; events are dropped
/// silently when no one is listening.
pub struct PipelineController {
    fetcher: TranscriptFetcher,
    model: Arc<dyn ModelClient>,
    writer: Arc<dyn DocumentWriter>,
    retry: RetryPolicy,
    cancel: CancellationToken,
    events: mpsc::UnboundedSender<ProgressEvent>,
}

impl PipelineController {
    /// Creates a controller along with the receiving end of its progress
    /// events.
    pub fn new(
        fetcher: TranscriptFetcher,
        model: Arc<dyn ModelClient>,
        writer: Arc<dyn DocumentWriter>,
        retry: RetryPolicy,
    ) -> (Self, mpsc::UnboundedReceiver<ProgressEvent>) {
        let (events, receiver) = mpsc::unbounded_channel();
        let controller = Self {
            fetcher,
            model,
            writer,
            retry,
            cancel: CancellationToken::new(),
            events,
        };
        (controller, receiver)
    }

    /// Token that cancels this controller's runs when triggered.
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Runs a job to its terminal state.
    ///
    /// Returns `Ok` for completed and cancelled jobs; cancellation is a
    /// normal outcome, visible as [`JobState::Cancelled`] on the returned
    /// job. Returns `Err` only when the job failed.
    #[instrument(skip(self, params), fields(reference = %params.request.reference))]
    pub async fn run(&self, params: JobParams) -> Result<JobOutcome> {
        let mut job = Job::new(params);
        info!(job_id = %job.id, "Starting pipeline job");

        self.set_state(&mut job, JobState::Fetching);
        if self.cancel.is_cancelled() {
            return Ok(self.finish_cancelled(job));
        }
        let fetched = tokio::select! {
            _ = self.cancel.cancelled() => Err(OmskrivError::Cancelled),
            result = self.fetcher.fetch(&job.params.request) => result,
        };
        let transcript = match fetched {
            Ok(transcript) => transcript,
            Err(OmskrivError::Cancelled) => return Ok(self.finish_cancelled(job)),
            Err(err) => return Err(self.finish_failed(&mut job, err)),
        };
        debug!(words = transcript.word_count(), "Transcript fetched");

        self.set_state(&mut job, JobState::Splitting);
        let chunks = match chunking::split(&transcript.text, &job.params.chunk_spec) {
            Ok(chunks) => chunks,
            Err(err) => return Err(self.finish_failed(&mut job, err)),
        };
        job.chunks = chunks
            .into_iter()
            .map(|chunk| ProcessedChunk::pending(chunk.index, chunk.text))
            .collect();
        let total = job.chunks.len();
        self.emit(ProgressEvent::ChunksPlanned {
            job_id: job.id,
            total,
        });
        info!(total, "Transcript split into chunks");

        if self.cancel.is_cancelled() {
            return Ok(self.finish_cancelled(job));
        }

        self.set_state(&mut job, JobState::Processing);
        let mut failed = 0usize;
        for index in 0..total {
            if self.cancel.is_cancelled() {
                return Ok(self.finish_cancelled(job));
            }
            self.set_chunk_status(&mut job, index, ChunkStatus::InFlight, None);
            let source = job.chunks[index].source_text.clone();
            match self.transform_chunk(&source, &job.params.prompt).await {
                Ok(text) => {
                    let text = text.trim().to_string();
                    job.chunks[index].transformed_text = Some(text.clone());
                    self.set_chunk_status(&mut job, index, ChunkStatus::Done, Some(text));
                }
                Err(OmskrivError::Cancelled) => {
                    self.set_chunk_status(&mut job, index, ChunkStatus::Cancelled, None);
                    return Ok(self.finish_cancelled(job));
                }
                Err(err) => {
                    warn!(index, error = %err, "Chunk failed permanently, keeping source text");
                    job.chunks[index].transformed_text = Some(source);
                    self.set_chunk_status(&mut job, index, ChunkStatus::Failed, None);
                    failed += 1;
                }
            }
        }
        if failed > 0 {
            warn!(failed, total, "Some chunks kept their original text");
        }

        self.set_state(&mut job, JobState::Assembling);
        let body = job
            .chunks
            .iter()
            .map(|chunk| chunk.output_text())
            .collect::<Vec<_>>()
            .join(CHUNK_SEPARATOR);
        let artifact = match self
            .writer
            .write(&job.params.title, &body, job.params.format)
            .await
        {
            Ok(path) => path,
            Err(err) => {
                let err = OmskrivError::Assembly(format!("document writer failed: {}", err));
                return Err(self.finish_failed(&mut job, err));
            }
        };

        self.set_state(&mut job, JobState::Completed);
        info!(artifact = %artifact.display(), "Pipeline job completed");
        Ok(JobOutcome {
            job,
            artifact: Some(artifact),
        })
    }

    /// Transforms one chunk, retrying connectivity failures with a
    /// constant backoff.
    async fn transform_chunk(&self, chunk_text: &str, prompt: &str) -> Result<String> {
        let attempts = self.retry.max_retries + 1;
        let mut attempt = 1u32;
        loop {
            match self.model.transform(chunk_text, prompt, &self.cancel).await {
                Ok(text) => return Ok(text),
                Err(OmskrivError::ModelUnavailable(message)) if attempt < attempts => {
                    warn!(attempt, error = %message, "Model call failed, retrying");
                    tokio::select! {
                        _ = self.cancel.cancelled() => return Err(OmskrivError::Cancelled),
                        _ = tokio::time::sleep(self.retry.backoff) => {}
                    }
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }

    fn set_state(&self, job: &mut Job, state: JobState) {
        job.state = state;
        debug!(job_id = %job.id, %state, "Job state changed");
        self.emit(ProgressEvent::StateChanged {
            job_id: job.id,
            state,
        });
    }

    fn set_chunk_status(
        &self,
        job: &mut Job,
        index: usize,
        status: ChunkStatus,
        text: Option<String>,
    ) {
        job.chunks[index].status = status;
        self.emit(ProgressEvent::ChunkUpdated {
            job_id: job.id,
            index,
            status,
            text,
        });
    }

    fn emit(&self, event: ProgressEvent) {
        // Receiver may be gone when nothing renders progress.
        let _ = self.events.send(event);
    }

    fn finish_cancelled(&self, mut job: Job) -> JobOutcome {
        self.set_state(&mut job, JobState::Cancelled);
        info!(job_id = %job.id, "Pipeline job cancelled");
        JobOutcome {
            job,
            artifact: None,
        }
    }

    fn finish_failed(&self, job: &mut Job, err: OmskrivError) -> OmskrivError {
        job.error = Some(err.to_string());
        self.set_state(job, JobState::Failed);
        error!(job_id = %job.id, error = %err, "Pipeline job failed");
        err
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunking::ChunkSpec;
    use crate::document::OutputFormat;
    use crate::transcript::{Transcript, TranscriptRequest, TranscriptSegment, TranscriptSource};
    use async_trait::async_trait;
    use std::path::PathBuf;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;

    struct StaticSource {
        text: String,
    }

    #[async_trait]
    impl TranscriptSource for StaticSource {
        async fn fetch(&self, video_id: &str) -> Result<Transcript> {
            Ok(Transcript::new(
                video_id.to_string(),
                vec![TranscriptSegment {
                    text: self.text.clone(),
                    start_seconds: Some(0.0),
                }],
            ))
        }
    }

    struct FailingSource;

    #[async_trait]
    impl TranscriptSource for FailingSource {
        async fn fetch(&self, _video_id: &str) -> Result<Transcript> {
            Err(OmskrivError::TranscriptSource("no captions".into()))
        }
    }

    enum ModelScript {
        /// Succeed on every call, padding the output with whitespace.
        Succeed,
        /// Fail the first N calls, then succeed.
        FailFirst(u32),
        /// Fail every call.
        AlwaysFail,
        /// Succeed N times, then trigger cancellation.
        CancelAfter(u32),
    }

    struct ScriptedModel {
        script: ModelScript,
        calls: AtomicU32,
    }

    impl ScriptedModel {
        fn new(script: ModelScript) -> Arc<Self> {
            Arc::new(Self {
                script,
                calls: AtomicU32::new(0),
            })
        }

        fn calls(&self) -> u32 {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl ModelClient for ScriptedModel {
        async fn transform(
            &self,
            chunk_text: &str,
            _prompt: &str,
            cancel: &CancellationToken,
        ) -> Result<String> {
            if cancel.is_cancelled() {
                return Err(OmskrivError::Cancelled);
            }
            let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            match self.script {
                ModelScript::Succeed => Ok(format!("  <{}>  ", chunk_text)),
                ModelScript::FailFirst(failures) => {
                    if call <= failures {
                        Err(OmskrivError::ModelUnavailable("connection refused".into()))
                    } else {
                        Ok(format!("<{}>", chunk_text))
                    }
                }
                ModelScript::AlwaysFail => {
                    Err(OmskrivError::ModelUnavailable("connection refused".into()))
                }
                ModelScript::CancelAfter(successes) => {
                    if call <= successes {
                        Ok(format!("<{}>", chunk_text))
                    } else {
                        cancel.cancel();
                        Err(OmskrivError::Cancelled)
                    }
                }
            }
        }
    }

    struct RecordingWriter {
        written: Mutex<Option<(String, String, OutputFormat)>>,
    }

    impl RecordingWriter {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                written: Mutex::new(None),
            })
        }

        fn take(&self) -> Option<(String, String, OutputFormat)> {
            self.written.lock().unwrap().take()
        }
    }

    #[async_trait]
    impl DocumentWriter for RecordingWriter {
        async fn write(&self, title: &str, body: &str, format: OutputFormat) -> Result<PathBuf> {
            *self.written.lock().unwrap() = Some((title.to_string(), body.to_string(), format));
            Ok(PathBuf::from("/tmp/out.txt"))
        }
    }

    struct FailingWriter;

    #[async_trait]
    impl DocumentWriter for FailingWriter {
        async fn write(&self, _title: &str, _body: &str, _format: OutputFormat) -> Result<PathBuf> {
            Err(OmskrivError::Write("disk full".into()))
        }
    }

    fn params(max_words: usize, overlap_words: usize) -> JobParams {
        JobParams {
            request: TranscriptRequest::new("dQw4w9WgXcQ", 0, Duration::from_secs(0)),
            chunk_spec: ChunkSpec::new(max_words, overlap_words).unwrap(),
            prompt: "Tidy this up.".to_string(),
            title: "Test Document".to_string(),
            format: OutputFormat::Txt,
        }
    }

    fn fast_retry(max_retries: u32) -> RetryPolicy {
        RetryPolicy {
            max_retries,
            backoff: Duration::from_millis(1),
        }
    }

    fn controller_with(
        source: Arc<dyn TranscriptSource>,
        model: Arc<dyn ModelClient>,
        writer: Arc<dyn DocumentWriter>,
        retry: RetryPolicy,
    ) -> (
        PipelineController,
        mpsc::UnboundedReceiver<ProgressEvent>,
    ) {
        PipelineController::new(TranscriptFetcher::new(source), model, writer, retry)
    }

    #[tokio::test]
    async fn test_full_pipeline_completes() {
        let source = Arc::new(StaticSource {
            text: "one two three four five six seven eight".into(),
        });
        let model = ScriptedModel::new(ModelScript::Succeed);
        let writer = RecordingWriter::new();
        let (controller, _events) =
            controller_with(source, model.clone(), writer.clone(), fast_retry(2));

        let outcome = controller.run(params(4, 2)).await.unwrap();

        assert_eq!(outcome.job.state, JobState::Completed);
        assert_eq!(outcome.artifact, Some(PathBuf::from("/tmp/out.txt")));
        assert_eq!(outcome.job.chunks.len(), 3);
        assert!(outcome
            .job
            .chunks
            .iter()
            .all(|c| c.status == ChunkStatus::Done));
        assert_eq!(model.calls(), 3);

        let (title, body, format) = writer.take().unwrap();
        assert_eq!(title, "Test Document");
        assert_eq!(format, OutputFormat::Txt);
        assert_eq!(
            body,
            "<one two three four>\n\n<three four five six>\n\n<five six seven eight>"
        );
    }

    #[tokio::test]
    async fn test_chunk_retry_succeeds_on_third_attempt() {
        let source = Arc::new(StaticSource {
            text: "alpha beta gamma".into(),
        });
        let model = ScriptedModel::new(ModelScript::FailFirst(2));
        let writer = RecordingWriter::new();
        let (controller, _events) =
            controller_with(source, model.clone(), writer, fast_retry(2));

        let outcome = controller.run(params(10, 2)).await.unwrap();

        assert_eq!(outcome.job.state, JobState::Completed);
        assert_eq!(model.calls(), 3);
        assert_eq!(outcome.job.chunks[0].status, ChunkStatus::Done);
        assert_eq!(outcome.job.chunks[0].output_text(), "<alpha beta gamma>");
    }

    #[tokio::test]
    async fn test_failed_chunks_keep_source_text() {
        let source = Arc::new(StaticSource {
            text: "one two three four five six seven eight".into(),
        });
        let model = ScriptedModel::new(ModelScript::AlwaysFail);
        let writer = RecordingWriter::new();
        let (controller, _events) =
            controller_with(source, model.clone(), writer.clone(), fast_retry(1));

        let outcome = controller.run(params(4, 2)).await.unwrap();

        assert_eq!(outcome.job.state, JobState::Completed);
        assert_eq!(model.calls(), 6);
        assert!(outcome
            .job
            .chunks
            .iter()
            .all(|c| c.status == ChunkStatus::Failed));
        assert!(outcome
            .job
            .chunks
            .iter()
            .all(|c| c.transformed_text.as_deref() == Some(c.source_text.as_str())));

        let (_, body, _) = writer.take().unwrap();
        assert_eq!(
            body,
            "one two three four\n\nthree four five six\n\nfive six seven eight"
        );
    }

    #[tokio::test]
    async fn test_cancel_before_start_produces_no_chunks() {
        let source = Arc::new(StaticSource {
            text: "one two three".into(),
        });
        let model = ScriptedModel::new(ModelScript::Succeed);
        let writer = RecordingWriter::new();
        let (controller, _events) =
            controller_with(source, model.clone(), writer.clone(), fast_retry(2));

        controller.cancel_token().cancel();
        let outcome = controller.run(params(4, 2)).await.unwrap();

        assert_eq!(outcome.job.state, JobState::Cancelled);
        assert!(outcome.artifact.is_none());
        assert!(outcome.job.chunks.is_empty());
        assert_eq!(model.calls(), 0);
        assert!(writer.take().is_none());
    }

    #[tokio::test]
    async fn test_cancel_during_processing_stops_remaining_chunks() {
        let source = Arc::new(StaticSource {
            text: "one two three four five six seven eight".into(),
        });
        let model = ScriptedModel::new(ModelScript::CancelAfter(2));
        let writer = RecordingWriter::new();
        let (controller, _events) =
            controller_with(source, model, writer.clone(), fast_retry(2));

        let outcome = controller.run(params(4, 2)).await.unwrap();

        assert_eq!(outcome.job.state, JobState::Cancelled);
        assert!(outcome.artifact.is_none());
        assert!(outcome.job.error.is_none());
        let statuses: Vec<ChunkStatus> = outcome.job.chunks.iter().map(|c| c.status).collect();
        assert_eq!(
            statuses,
            vec![ChunkStatus::Done, ChunkStatus::Done, ChunkStatus::Cancelled]
        );
        assert!(writer.take().is_none());
    }

    #[tokio::test]
    async fn test_fetch_failure_fails_job() {
        let source = Arc::new(FailingSource);
        let model = ScriptedModel::new(ModelScript::Succeed);
        let writer = RecordingWriter::new();
        let (controller, mut events) =
            controller_with(source, model.clone(), writer.clone(), fast_retry(2));

        let mut run_params = params(4, 2);
        run_params.request = TranscriptRequest::new("dQw4w9WgXcQ", 1, Duration::from_millis(1));
        let err = controller.run(run_params).await.unwrap_err();

        assert!(matches!(
            err,
            OmskrivError::TranscriptUnavailable { attempts: 2, .. }
        ));
        assert_eq!(model.calls(), 0);
        assert!(writer.take().is_none());

        let mut last_state = None;
        while let Ok(event) = events.try_recv() {
            if let ProgressEvent::StateChanged { state, .. } = event {
                last_state = Some(state);
            }
        }
        assert_eq!(last_state, Some(JobState::Failed));
    }

    #[tokio::test]
    async fn test_invalid_chunk_spec_fails_job() {
        let source = Arc::new(StaticSource {
            text: "one two three".into(),
        });
        let model = ScriptedModel::new(ModelScript::Succeed);
        let writer = RecordingWriter::new();
        let (controller, mut events) = controller_with(source, model, writer, fast_retry(2));

        let bad = JobParams {
            request: TranscriptRequest::new("dQw4w9WgXcQ", 0, Duration::from_secs(0)),
            chunk_spec: ChunkSpec {
                max_words: 5,
                overlap_words: 5,
            },
            prompt: "Tidy this up.".to_string(),
            title: "Test Document".to_string(),
            format: OutputFormat::Txt,
        };
        let err = controller.run(bad).await.unwrap_err();
        assert!(matches!(err, OmskrivError::InvalidChunkSpec(_)));

        let mut states = Vec::new();
        while let Ok(event) = events.try_recv() {
            if let ProgressEvent::StateChanged { state, .. } = event {
                states.push(state);
            }
        }
        assert_eq!(
            states,
            vec![JobState::Fetching, JobState::Splitting, JobState::Failed]
        );
    }

    #[tokio::test]
    async fn test_writer_failure_surfaces_as_assembly_error() {
        let source = Arc::new(StaticSource {
            text: "alpha beta".into(),
        });
        let model = ScriptedModel::new(ModelScript::Succeed);
        let (controller, _events) =
            controller_with(source, model, Arc::new(FailingWriter), fast_retry(2));

        let err = controller.run(params(4, 2)).await.unwrap_err();
        match err {
            OmskrivError::Assembly(message) => assert!(message.contains("disk full")),
            other => panic!("Expected assembly error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_events_follow_lifecycle_order() {
        let source = Arc::new(StaticSource {
            text: "one two three four five six seven eight".into(),
        });
        let model = ScriptedModel::new(ModelScript::Succeed);
        let writer = RecordingWriter::new();
        let (controller, mut events) = controller_with(source, model, writer, fast_retry(2));

        controller.run(params(4, 2)).await.unwrap();

        let mut collected = Vec::new();
        while let Ok(event) = events.try_recv() {
            collected.push(event);
        }

        let described: Vec<String> = collected
            .iter()
            .map(|event| match event {
                ProgressEvent::StateChanged { state, .. } => format!("state:{}", state),
                ProgressEvent::ChunksPlanned { total, .. } => format!("planned:{}", total),
                ProgressEvent::ChunkUpdated { index, status, .. } => {
                    format!("chunk:{}:{}", index, status)
                }
            })
            .collect();
        assert_eq!(
            described,
            vec![
                "state:fetching",
                "state:splitting",
                "planned:3",
                "state:processing",
                "chunk:0:in-flight",
                "chunk:0:done",
                "chunk:1:in-flight",
                "chunk:1:done",
                "chunk:2:in-flight",
                "chunk:2:done",
                "state:assembling",
                "state:completed",
            ]
        );

        let done_texts: Vec<String> = collected
            .iter()
            .filter_map(|event| match event {
                ProgressEvent::ChunkUpdated {
                    status: ChunkStatus::Done,
                    text,
                    ..
                } => text.clone(),
                _ => None,
            })
            .collect();
        assert_eq!(done_texts[0], "<one two three four>");
    }
}
