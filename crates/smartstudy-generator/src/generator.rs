//! Summary, quiz and flashcard generation against the shared session

use crate::cancel::CancelToken;
use crate::config::GeneratorConfig;
use crate::context::build_context_with;
use crate::error::GeneratorError;
use crate::events::{emit_status, EventSink};
use crate::normalize::{
    enforce_item_count, normalize_flashcards, normalize_quiz_items, normalize_summary_with_limit,
};
use crate::parser::{parse_flashcards_from_text, parse_response};
use crate::prompt::{normalize_desired_count, PromptBuilder};
use crate::schema::SchemaKind;
use crate::session::SessionManager;
use crate::types::{DocumentContext, GenerationRequest};
use futures::StreamExt;
use smartstudy_domain::{Flashcard, QuizItem};
use smartstudy_llm::{ModelSession, PromptRequest};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Status while the summary streams in
pub const STATUS_SUMMARY: &str = "Generating summary…";
/// Status when the summary is done
pub const STATUS_SUMMARY_READY: &str = "Summary ready.";
/// Status while quiz questions stream in
pub const STATUS_QUIZ: &str = "Generating quiz questions…";
/// Status when the quiz is done
pub const STATUS_QUIZ_READY: &str = "Quiz generation complete.";
/// Status while flashcards stream in
pub const STATUS_FLASHCARDS: &str = "Generating flashcards…";
/// Status before the unconstrained flashcard retry
pub const STATUS_FLASHCARDS_RETRY: &str = "Retrying flashcard generation with relaxed format…";
/// Status while the retry streams in
pub const STATUS_FLASHCARDS_PARSING: &str = "Parsing flashcard responses…";
/// Status when flashcards are done
pub const STATUS_FLASHCARDS_READY: &str = "Flashcards ready.";

/// Generates study material through a [`SessionManager`]
///
/// Malformed model output never fails a call; it yields fewer items.
/// Only an unusable runtime, a cancelled run, an empty summary, or a
/// runtime failure mid-prompt surface as errors.
pub struct Generator {
    sessions: SessionManager,
    config: GeneratorConfig,
}

impl Generator {
    /// Create a new Generator
    pub fn new(sessions: SessionManager) -> Self {
        Self {
            sessions,
            config: GeneratorConfig::default(),
        }
    }

    /// Use a specific configuration
    pub fn with_config(mut self, config: GeneratorConfig) -> Self {
        self.config = config;
        self
    }

    /// The session owner
    pub fn sessions(&self) -> &SessionManager {
        &self.sessions
    }

    /// Active configuration
    pub fn config(&self) -> &GeneratorConfig {
        &self.config
    }

    /// Generate a summary of at most the configured word count
    pub async fn generate_summary(
        &self,
        request: &GenerationRequest,
        events: Option<&EventSink>,
    ) -> Result<String, GeneratorError> {
        let context = self.context(request);
        let session = self.sessions.ensure_session(events, &request.cancel).await?;

        emit_status(events, STATUS_SUMMARY);
        let prompt = PromptBuilder::new(&request.meta, &context).summary();
        let raw = self
            .run_prompt(
                &session,
                PromptRequest::new(prompt).with_schema(SchemaKind::Summary.schema()),
                STATUS_SUMMARY,
                events,
                &request.cancel,
            )
            .await?;

        let summary = normalize_summary_with_limit(&parse_response(&raw), self.config.summary_word_limit);
        if summary.is_empty() {
            warn!("Summary for '{}' normalized to nothing", request.meta.title());
            return Err(GeneratorError::EmptySummary);
        }

        info!("Summary ready: {} words", summary.split(' ').count());
        emit_status(events, STATUS_SUMMARY_READY);
        Ok(summary)
    }

    /// Generate quiz questions, truncated to the desired count
    ///
    /// Unusable output yields an empty quiz, not an error.
    pub async fn generate_quiz(
        &self,
        request: &GenerationRequest,
        events: Option<&EventSink>,
    ) -> Result<Vec<QuizItem>, GeneratorError> {
        let context = self.context(request);
        let desired = normalize_desired_count(request.desired_count.map(i64::from));
        let session = self.sessions.ensure_session(events, &request.cancel).await?;

        emit_status(events, STATUS_QUIZ);
        let prompt = PromptBuilder::new(&request.meta, &context)
            .with_desired_count(desired)
            .quiz();
        let raw = self
            .run_prompt(
                &session,
                PromptRequest::new(prompt).with_schema(SchemaKind::Quiz.schema()),
                STATUS_QUIZ,
                events,
                &request.cancel,
            )
            .await?;

        let items = enforce_item_count(normalize_quiz_items(&parse_response(&raw)), desired);
        info!("Quiz ready: {} questions", items.len());
        emit_status(events, STATUS_QUIZ_READY);
        Ok(items)
    }

    /// Generate flashcards, truncated to the desired count
    ///
    /// If structured output yields no usable card, one unconstrained retry
    /// is made and its text is parsed leniently.
    pub async fn generate_flashcards(
        &self,
        request: &GenerationRequest,
        events: Option<&EventSink>,
    ) -> Result<Vec<Flashcard>, GeneratorError> {
        let context = self.context(request);
        let desired = normalize_desired_count(request.desired_count.map(i64::from));
        let session = self.sessions.ensure_session(events, &request.cancel).await?;
        let prompts = PromptBuilder::new(&request.meta, &context).with_desired_count(desired);

        emit_status(events, STATUS_FLASHCARDS);
        let raw = self
            .run_prompt(
                &session,
                PromptRequest::new(prompts.flashcards()).with_schema(SchemaKind::Flashcards.schema()),
                STATUS_FLASHCARDS,
                events,
                &request.cancel,
            )
            .await?;
        let mut cards = enforce_item_count(normalize_flashcards(&parse_response(&raw)), desired);

        if cards.is_empty() {
            info!("Structured flashcard output was unusable; retrying with relaxed format");
            emit_status(events, STATUS_FLASHCARDS_RETRY);
            let relaxed_raw = self
                .run_prompt(
                    &session,
                    PromptRequest::new(prompts.relaxed_flashcards()),
                    STATUS_FLASHCARDS_PARSING,
                    events,
                    &request.cancel,
                )
                .await?;

            let relaxed = normalize_flashcards(&parse_response(&relaxed_raw));
            cards = if relaxed.is_empty() {
                parse_flashcards_from_text(&relaxed_raw)
            } else {
                relaxed
            };
            cards = enforce_item_count(cards, desired);
        }

        info!("Flashcards ready: {} cards", cards.len());
        emit_status(events, STATUS_FLASHCARDS_READY);
        Ok(cards)
    }

    /// Context for prompting; a prior model summary replaces the excerpt
    fn context(&self, request: &GenerationRequest) -> DocumentContext {
        let mut context = build_context_with(
            &self.config,
            &request.document_text,
            &request.chunks,
            request.page_count,
        );
        if let Some(summary) = request.summary.as_deref().filter(|s| !s.trim().is_empty()) {
            context.summary_excerpt = summary.to_string();
        }
        context
    }

    /// Issue a prompt and concatenate its fragments
    ///
    /// Every non-empty fragment re-emits `status`. Cancellation drops the
    /// stream, which aborts the generation.
    async fn run_prompt(
        &self,
        session: &Arc<dyn ModelSession>,
        request: PromptRequest,
        status: &str,
        events: Option<&EventSink>,
        cancel: &CancelToken,
    ) -> Result<String, GeneratorError> {
        debug!("Prompt length: {} chars", request.prompt.len());

        let mut stream = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(GeneratorError::Cancelled),
            stream = session.prompt(request) => stream.map_err(prompt_failure)?,
        };

        let mut text = String::new();
        loop {
            let next = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(GeneratorError::Cancelled),
                next = stream.next() => next,
            };
            match next {
                Some(Ok(fragment)) => {
                    if !fragment.is_empty() {
                        emit_status(events, status);
                    }
                    text.push_str(&fragment);
                }
                Some(Err(e)) => return Err(prompt_failure(e)),
                None => break,
            }
        }

        debug!("Response length: {} chars", text.len());
        Ok(text)
    }
}

fn prompt_failure(e: smartstudy_llm::LlmError) -> GeneratorError {
    let error = GeneratorError::from(e);
    if !error.is_cancelled() {
        warn!("Prompt failed: {}", error);
    }
    error
}
