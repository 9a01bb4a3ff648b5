//! Upload pipeline: summary, then quiz, then flashcards
//!
//! One run per uploaded document. The summary is required; a failure there
//! halts the run. Quiz and flashcard failures are recorded on their step and
//! the run moves on. Starting a new run cancels the one in flight.

use crate::cancel::CancelToken;
use crate::chunking::TextChunker;
use crate::config::StudySettings;
use crate::error::GeneratorError;
use crate::events::{EventSink, GenerationEvent, PipelineEvent};
use crate::generator::Generator;
use crate::types::GenerationRequest;
use smartstudy_domain::{DocumentMeta, SessionPersistence, Stage, StepState, StudySession};
use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, MutexGuard, PoisonError};
use tokio::sync::{mpsc, Mutex};
use tracing::{error, info, warn};

/// Note emitted when the immediate save after the summary fails
pub const SAVE_FAILED_NOTE: &str =
    "Saving summary failed; study data will not persist across reloads.";

/// Sink for pipeline events; sending never blocks
pub type PipelineSink = mpsc::UnboundedSender<PipelineEvent>;

/// An extracted document ready for generation
#[derive(Debug, Clone)]
pub struct StudyUpload {
    /// Document identity
    pub meta: DocumentMeta,

    /// Full extracted text
    pub text: String,

    /// Ordered chunks; empty means the pipeline chunks `text` itself
    pub chunks: Vec<String>,

    /// Number of pages in the source document
    pub page_count: usize,
}

impl StudyUpload {
    /// Create an upload with no precomputed chunks
    pub fn new(meta: DocumentMeta, text: impl Into<String>, page_count: usize) -> Self {
        Self {
            meta,
            text: text.into(),
            chunks: Vec::new(),
            page_count,
        }
    }

    /// Use chunks produced by the extractor
    pub fn with_chunks(mut self, chunks: Vec<String>) -> Self {
        self.chunks = chunks;
        self
    }
}

/// How a pipeline run ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineOutcome {
    /// Every stage ran; quiz or flashcard steps may still have failed
    Completed,

    /// The summary failed, so later stages were skipped
    Halted,

    /// The run was cancelled
    Cancelled,
}

/// Runs the generation stages for an upload and keeps the session record
pub struct StudyPipeline {
    generator: Arc<Generator>,
    session: Arc<Mutex<StudySession>>,
    persistence: Arc<dyn SessionPersistence>,
    settings: std::sync::Mutex<StudySettings>,
    active: std::sync::Mutex<Option<CancelToken>>,
    steps: std::sync::Mutex<HashMap<Stage, StepState>>,
}

impl StudyPipeline {
    /// Create a pipeline over a fresh session record
    pub fn new(generator: Arc<Generator>, persistence: Arc<dyn SessionPersistence>) -> Self {
        Self {
            generator,
            session: Arc::new(Mutex::new(StudySession::new())),
            persistence,
            settings: std::sync::Mutex::new(StudySettings::default()),
            active: std::sync::Mutex::new(None),
            steps: std::sync::Mutex::new(HashMap::new()),
        }
    }

    /// Use specific count settings
    pub fn with_settings(self, settings: StudySettings) -> Self {
        self.set_settings(settings);
        self
    }

    /// Current count settings
    pub fn settings(&self) -> StudySettings {
        *lock(&self.settings)
    }

    /// Replace the count settings; applies to the next stage that starts
    pub fn set_settings(&self, settings: StudySettings) {
        *lock(&self.settings) = settings.normalized();
    }

    /// Shared handle to the session record
    pub fn session(&self) -> Arc<Mutex<StudySession>> {
        Arc::clone(&self.session)
    }

    /// Copy of the session record
    pub async fn snapshot(&self) -> StudySession {
        self.session.lock().await.clone()
    }

    /// State of a stage in the current or last run
    pub fn step_state(&self, stage: Stage) -> StepState {
        lock(&self.steps).get(&stage).copied().unwrap_or_default()
    }

    /// Cancel the run in flight, if any
    pub fn cancel(&self) {
        if let Some(token) = lock(&self.active).as_ref() {
            token.cancel();
        }
    }

    /// Run every stage for an upload
    pub async fn run(&self, upload: StudyUpload, events: Option<&PipelineSink>) -> PipelineOutcome {
        let cancel = self.begin_run();
        for stage in Stage::ALL {
            self.set_step(stage, StepState::Idle, &cancel, events);
        }

        let StudyUpload {
            meta,
            text,
            chunks,
            page_count,
        } = upload;
        let chunks = if chunks.is_empty() {
            TextChunker::new(self.generator.config().max_chunk_size).chunk(&text)
        } else {
            chunks
        };
        info!(
            "Starting study run for '{}' ({} chunks, {} pages)",
            meta.title(),
            chunks.len(),
            page_count
        );

        {
            let mut session = self.session.lock().await;
            session.reset();
            session.set_pdf_meta(meta.clone());
            session.set_source_text(text.clone(), chunks.clone(), page_count);
        }

        let base = GenerationRequest::new(text, chunks, page_count, meta).with_cancel(cancel.clone());

        // Summary
        self.set_step(Stage::Summary, StepState::Pending, &cancel, events);
        let request = &base;
        let summary = relay(Stage::Summary, events, |sink| async move {
            self.generator.generate_summary(request, Some(&sink)).await
        })
        .await;
        let summary = match summary {
            Ok(summary) => summary,
            Err(e) => {
                return self
                    .stage_failed(Stage::Summary, e, &cancel, events)
                    .unwrap_or(PipelineOutcome::Halted);
            }
        };
        let snapshot = {
            let mut session = self.session.lock().await;
            if cancel.is_cancelled() {
                drop(session);
                return self.cancelled(Stage::Summary, &cancel, events);
            }
            session.set_summary(summary.clone());
            self.set_step(Stage::Summary, StepState::Done, &cancel, events);
            session.clone()
        };
        // The write is synchronous; keep it off the session lock and the async workers
        let persistence = Arc::clone(&self.persistence);
        let saved = tokio::task::spawn_blocking(move || {
            persistence.persist_now(&snapshot).map_err(|e| e.to_string())
        })
        .await
        .unwrap_or_else(|e| Err(e.to_string()));
        if let Err(e) = saved {
            warn!("Failed to save session after summary: {}", e);
            notify(events, PipelineEvent::Note(SAVE_FAILED_NOTE.to_string()));
        }

        // Quiz
        self.set_step(Stage::Quiz, StepState::Pending, &cancel, events);
        let request = base
            .clone()
            .with_summary(summary.clone())
            .with_desired_count(self.settings().quiz_target());
        let quiz = relay(Stage::Quiz, events, |sink| async move {
            self.generator.generate_quiz(&request, Some(&sink)).await
        })
        .await;
        match quiz {
            Ok(items) => {
                let mut session = self.session.lock().await;
                if cancel.is_cancelled() {
                    drop(session);
                    return self.cancelled(Stage::Quiz, &cancel, events);
                }
                session.set_quiz_items(items);
                self.set_step(Stage::Quiz, StepState::Done, &cancel, events);
                self.persistence.schedule_persist(&session);
            }
            Err(e) => {
                if let Some(outcome) = self.stage_failed(Stage::Quiz, e, &cancel, events) {
                    return outcome;
                }
            }
        }

        // Flashcards
        self.set_step(Stage::Flashcards, StepState::Pending, &cancel, events);
        let request = base
            .with_summary(summary)
            .with_desired_count(self.settings().flashcard_target());
        let flashcards = relay(Stage::Flashcards, events, |sink| async move {
            self.generator.generate_flashcards(&request, Some(&sink)).await
        })
        .await;
        match flashcards {
            Ok(cards) => {
                let mut session = self.session.lock().await;
                if cancel.is_cancelled() {
                    drop(session);
                    return self.cancelled(Stage::Flashcards, &cancel, events);
                }
                session.set_flashcards(cards);
                self.set_step(Stage::Flashcards, StepState::Done, &cancel, events);
                self.persistence.schedule_persist(&session);
            }
            Err(e) => {
                if let Some(outcome) = self.stage_failed(Stage::Flashcards, e, &cancel, events) {
                    return outcome;
                }
            }
        }

        info!("Study run complete");
        PipelineOutcome::Completed
    }

    /// Cancel the previous run and register a token for this one
    fn begin_run(&self) -> CancelToken {
        let token = CancelToken::new();
        if let Some(previous) = lock(&self.active).replace(token.clone()) {
            previous.cancel();
        }
        token
    }

    /// Record a failed stage; returns an outcome when the run must stop
    fn stage_failed(
        &self,
        stage: Stage,
        e: GeneratorError,
        run: &CancelToken,
        events: Option<&PipelineSink>,
    ) -> Option<PipelineOutcome> {
        if e.is_cancelled() {
            return Some(self.cancelled(stage, run, events));
        }
        error!("{} generation failed: {}", stage, e);
        self.set_step(stage, StepState::Error, run, events);
        (stage == Stage::Summary).then_some(PipelineOutcome::Halted)
    }

    fn cancelled(&self, stage: Stage, run: &CancelToken, events: Option<&PipelineSink>) -> PipelineOutcome {
        info!("{} generation cancelled", stage);
        self.set_step(stage, StepState::Idle, run, events);
        PipelineOutcome::Cancelled
    }

    /// Record a step change; runs superseded by a newer one no longer report
    fn set_step(&self, stage: Stage, state: StepState, run: &CancelToken, events: Option<&PipelineSink>) {
        let current = lock(&self.active)
            .as_ref()
            .is_some_and(|active| active.same_signal(run));
        if !current {
            return;
        }
        lock(&self.steps).insert(stage, state);
        notify(events, PipelineEvent::Step(stage, state));
    }
}

/// Run `work` with a generation sink whose events are forwarded for `stage`
async fn relay<T, F, Fut>(stage: Stage, events: Option<&PipelineSink>, work: F) -> T
where
    F: FnOnce(EventSink) -> Fut,
    Fut: Future<Output = T>,
{
    let (tx, mut rx) = mpsc::unbounded_channel::<GenerationEvent>();
    let forward = async {
        while let Some(event) = rx.recv().await {
            notify(events, PipelineEvent::Generation(stage, event));
        }
    };
    // `work` owns the sender, so `forward` ends when it does
    let (result, ()) = tokio::join!(work(tx), forward);
    result
}

fn notify(events: Option<&PipelineSink>, event: PipelineEvent) {
    if let Some(sink) = events {
        let _ = sink.send(event);
    }
}

fn lock<T>(mutex: &std::sync::Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{CountMode, CountSetting};
    use crate::session::SessionManager;
    use smartstudy_domain::PersistError;
    use smartstudy_llm::{LlmError, MockRuntime};
    use std::time::Duration;

    const ALL_IN_ONE: &str = r#"{
        "summary": "Cells divide by mitosis.",
        "questions": [
            {"question": "Q1?", "options": ["a", "b", "c", "d"], "answer": "a", "explanation": ""},
            {"question": "Q2?", "options": ["a", "b", "c", "d"], "answer": "b", "explanation": ""}
        ],
        "flashcards": [
            {"question": "F1", "answer": "A1"},
            {"question": "F2", "answer": "A2"}
        ]
    }"#;

    #[derive(Default)]
    struct RecordingPersistence {
        fail: bool,
        saved: std::sync::Mutex<Vec<StudySession>>,
        scheduled: std::sync::Mutex<Vec<StudySession>>,
        // Session lock to inspect on each immediate save
        watched: std::sync::OnceLock<Arc<Mutex<StudySession>>>,
        lock_free_on_save: std::sync::Mutex<Vec<bool>>,
    }

    impl SessionPersistence for RecordingPersistence {
        fn persist_now(&self, session: &StudySession) -> Result<(), PersistError> {
            if self.fail {
                return Err("disk full".into());
            }
            if let Some(session_lock) = self.watched.get() {
                let free = session_lock.try_lock().is_ok();
                self.lock_free_on_save.lock().unwrap().push(free);
            }
            self.saved.lock().unwrap().push(session.clone());
            Ok(())
        }

        fn schedule_persist(&self, session: &StudySession) {
            self.scheduled.lock().unwrap().push(session.clone());
        }
    }

    fn pipeline(runtime: &MockRuntime, persistence: Arc<RecordingPersistence>) -> StudyPipeline {
        let generator = Generator::new(SessionManager::with_runtime(Arc::new(runtime.clone())));
        StudyPipeline::new(Arc::new(generator), persistence)
    }

    fn upload() -> StudyUpload {
        StudyUpload::new(
            DocumentMeta::new("doc-1", "cells.pdf", 10, 0, ""),
            "Cells divide by mitosis. Mitosis has phases.",
            1,
        )
    }

    fn drain(rx: &mut mpsc::UnboundedReceiver<PipelineEvent>) -> Vec<PipelineEvent> {
        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }
        events
    }

    #[tokio::test]
    async fn test_full_run() {
        let runtime = MockRuntime::new(ALL_IN_ONE);
        let persistence = Arc::new(RecordingPersistence::default());
        let pipeline = pipeline(&runtime, Arc::clone(&persistence));
        let (tx, mut rx) = mpsc::unbounded_channel();

        let outcome = pipeline.run(upload(), Some(&tx)).await;
        assert_eq!(outcome, PipelineOutcome::Completed);

        let session = pipeline.snapshot().await;
        assert_eq!(session.id.as_deref(), Some("doc-1"));
        assert_eq!(session.summary, "Cells divide by mitosis.");
        assert_eq!(session.quiz_items.len(), 2);
        assert_eq!(session.flashcards.len(), 2);
        assert_eq!(session.chunk_count, 1);

        for stage in Stage::ALL {
            assert_eq!(pipeline.step_state(stage), StepState::Done);
        }

        let saved = persistence.saved.lock().unwrap();
        assert_eq!(saved.len(), 1);
        assert_eq!(saved[0].summary, "Cells divide by mitosis.");
        assert!(saved[0].quiz_items.is_empty());
        assert_eq!(persistence.scheduled.lock().unwrap().len(), 2);

        let steps: Vec<_> = drain(&mut rx)
            .into_iter()
            .filter_map(|event| match event {
                PipelineEvent::Step(stage, state) if state != StepState::Idle => Some((stage, state)),
                _ => None,
            })
            .collect();
        assert_eq!(
            steps,
            vec![
                (Stage::Summary, StepState::Pending),
                (Stage::Summary, StepState::Done),
                (Stage::Quiz, StepState::Pending),
                (Stage::Quiz, StepState::Done),
                (Stage::Flashcards, StepState::Pending),
                (Stage::Flashcards, StepState::Done),
            ]
        );
    }

    #[tokio::test]
    async fn test_generation_events_are_tagged_by_stage() {
        let runtime = MockRuntime::new(ALL_IN_ONE);
        let pipeline = pipeline(&runtime, Arc::new(RecordingPersistence::default()));
        let (tx, mut rx) = mpsc::unbounded_channel();

        pipeline.run(upload(), Some(&tx)).await;

        let events = drain(&mut rx);
        assert!(events.contains(&PipelineEvent::Generation(
            Stage::Summary,
            GenerationEvent::Status(crate::generator::STATUS_SUMMARY_READY.to_string())
        )));
        assert!(events.contains(&PipelineEvent::Generation(
            Stage::Flashcards,
            GenerationEvent::Status(crate::generator::STATUS_FLASHCARDS_READY.to_string())
        )));
    }

    #[tokio::test]
    async fn test_summary_failure_halts() {
        let runtime = MockRuntime::new(r#"{"summary": ""}"#);
        let persistence = Arc::new(RecordingPersistence::default());
        let pipeline = pipeline(&runtime, Arc::clone(&persistence));

        let outcome = pipeline.run(upload(), None).await;
        assert_eq!(outcome, PipelineOutcome::Halted);
        assert_eq!(pipeline.step_state(Stage::Summary), StepState::Error);
        assert_eq!(pipeline.step_state(Stage::Quiz), StepState::Idle);
        assert_eq!(pipeline.step_state(Stage::Flashcards), StepState::Idle);
        assert_eq!(runtime.call_count(), 1);
        assert!(persistence.saved.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_quiz_failure_continues() {
        let runtime = MockRuntime::new(ALL_IN_ONE);
        runtime.push_response(ALL_IN_ONE);
        runtime.push_error(LlmError::Communication("reset".to_string()));
        let pipeline = pipeline(&runtime, Arc::new(RecordingPersistence::default()));

        let outcome = pipeline.run(upload(), None).await;
        assert_eq!(outcome, PipelineOutcome::Completed);
        assert_eq!(pipeline.step_state(Stage::Quiz), StepState::Error);
        assert_eq!(pipeline.step_state(Stage::Flashcards), StepState::Done);
        assert_eq!(pipeline.snapshot().await.flashcards.len(), 2);
    }

    #[tokio::test]
    async fn test_summary_save_runs_without_session_lock() {
        let runtime = MockRuntime::new(ALL_IN_ONE);
        let persistence = Arc::new(RecordingPersistence::default());
        let pipeline = pipeline(&runtime, Arc::clone(&persistence));
        let _ = persistence.watched.set(pipeline.session());

        pipeline.run(upload(), None).await;

        assert_eq!(*persistence.lock_free_on_save.lock().unwrap(), vec![true]);
        assert_eq!(persistence.saved.lock().unwrap()[0].summary, "Cells divide by mitosis.");
    }

    #[tokio::test]
    async fn test_save_failure_is_advisory() {
        let runtime = MockRuntime::new(ALL_IN_ONE);
        let persistence = Arc::new(RecordingPersistence {
            fail: true,
            ..RecordingPersistence::default()
        });
        let pipeline = pipeline(&runtime, persistence);
        let (tx, mut rx) = mpsc::unbounded_channel();

        let outcome = pipeline.run(upload(), Some(&tx)).await;
        assert_eq!(outcome, PipelineOutcome::Completed);
        assert!(drain(&mut rx).contains(&PipelineEvent::Note(SAVE_FAILED_NOTE.to_string())));
    }

    #[tokio::test]
    async fn test_custom_counts_from_settings() {
        let runtime = MockRuntime::new(ALL_IN_ONE);
        let settings = StudySettings {
            quiz: CountSetting::new(CountMode::Custom, 1),
            flashcard: CountSetting::new(CountMode::Auto, 1),
        };
        let pipeline =
            pipeline(&runtime, Arc::new(RecordingPersistence::default())).with_settings(settings);

        pipeline.run(upload(), None).await;

        let session = pipeline.snapshot().await;
        assert_eq!(session.quiz_items.len(), 1);
        assert_eq!(session.flashcards.len(), 2);
        assert!(runtime.prompts()[1].prompt.contains("exactly 1"));
    }

    #[tokio::test]
    async fn test_supplied_chunks_are_kept() {
        let runtime = MockRuntime::new(ALL_IN_ONE);
        let pipeline = pipeline(&runtime, Arc::new(RecordingPersistence::default()));
        let upload = upload().with_chunks(vec!["one".to_string(), "two".to_string()]);

        pipeline.run(upload, None).await;
        assert_eq!(pipeline.snapshot().await.source_chunks, vec!["one", "two"]);
    }

    #[tokio::test]
    async fn test_cancel_reverts_step_to_idle() {
        let runtime = MockRuntime::new(ALL_IN_ONE)
            .streaming(4)
            .with_fragment_delay(Duration::from_millis(20));
        let pipeline = Arc::new(pipeline(&runtime, Arc::new(RecordingPersistence::default())));

        let running = Arc::clone(&pipeline);
        let handle = tokio::spawn(async move { running.run(upload(), None).await });

        tokio::time::sleep(Duration::from_millis(50)).await;
        pipeline.cancel();

        let outcome = handle.await.unwrap();
        assert_eq!(outcome, PipelineOutcome::Cancelled);
        assert_eq!(pipeline.step_state(Stage::Summary), StepState::Idle);
        assert!(pipeline.snapshot().await.summary.is_empty());
    }

    #[tokio::test]
    async fn test_new_run_cancels_previous() {
        let runtime = MockRuntime::new(ALL_IN_ONE)
            .streaming(8)
            .with_fragment_delay(Duration::from_millis(5));
        let pipeline = Arc::new(pipeline(&runtime, Arc::new(RecordingPersistence::default())));

        let first = Arc::clone(&pipeline);
        let handle = tokio::spawn(async move { first.run(upload(), None).await });
        tokio::time::sleep(Duration::from_millis(20)).await;

        let second = StudyUpload::new(DocumentMeta::new("doc-2", "other.pdf", 5, 0, ""), "Other text.", 1);
        let outcome = pipeline.run(second, None).await;

        assert_eq!(handle.await.unwrap(), PipelineOutcome::Cancelled);
        assert_eq!(outcome, PipelineOutcome::Completed);
        assert_eq!(pipeline.snapshot().await.id.as_deref(), Some("doc-2"));
    }
}
