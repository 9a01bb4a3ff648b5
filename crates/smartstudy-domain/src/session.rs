//! Study session record
//!
//! A `StudySession` is the snapshot persisted per document: the extracted
//! source text, the generated study material, and the reader's position in
//! the quiz and flashcard decks. Generation results replace the previous
//! ones wholesale; there is no incremental merge.

use crate::document::DocumentMeta;
use crate::material::{Flashcard, QuizItem};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::{SystemTime, UNIX_EPOCH};

/// Persisted state of one study session
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StudySession {
    /// Session identifier (the document content hash)
    pub id: Option<String>,

    /// Metadata of the source document
    pub pdf_meta: Option<DocumentMeta>,

    /// Full extracted text
    pub raw_text: String,

    /// Ordered text chunks
    pub source_chunks: Vec<String>,

    /// Number of chunks extracted
    pub chunk_count: usize,

    /// Number of pages in the source document
    pub page_count: usize,

    /// Generated summary (empty until generated)
    pub summary: String,

    /// Generated quiz
    pub quiz_items: Vec<QuizItem>,

    /// Whether the reader finished the quiz
    pub quiz_completed: bool,

    /// Generated flashcards
    pub flashcards: Vec<Flashcard>,

    /// Current quiz position
    pub quiz_index: usize,

    /// Current flashcard position
    pub flashcard_index: usize,

    /// First mutation time (milliseconds since Unix epoch)
    pub created_at: Option<u64>,

    /// Last mutation time (milliseconds since Unix epoch)
    pub updated_at: Option<u64>,
}

impl StudySession {
    /// Create an empty session
    pub fn new() -> Self {
        Self::default()
    }

    /// Clear every field
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Restore from a serialized snapshot
    ///
    /// `None` or a non-object value resets the session. Missing or
    /// wrongly-typed fields fall back to their defaults individually, so a
    /// partially corrupt record still restores whatever is readable.
    pub fn hydrate(&mut self, serialized: Option<&Value>) {
        let Some(Value::Object(record)) = serialized else {
            self.reset();
            return;
        };

        let field = |key: &str| record.get(key).filter(|v| !v.is_null());

        *self = Self {
            id: lenient(field("id")),
            pdf_meta: lenient(field("pdfMeta")),
            raw_text: lenient(field("rawText")).unwrap_or_default(),
            source_chunks: lenient(field("sourceChunks")).unwrap_or_default(),
            chunk_count: lenient(field("chunkCount")).unwrap_or_default(),
            page_count: lenient(field("pageCount")).unwrap_or_default(),
            summary: lenient(field("summary")).unwrap_or_default(),
            quiz_items: lenient_items(field("quizItems")),
            quiz_completed: field("quizCompleted").map(truthy).unwrap_or(false),
            flashcards: lenient_items(field("flashcards")),
            quiz_index: lenient(field("quizIndex")).unwrap_or_default(),
            flashcard_index: lenient(field("flashcardIndex")).unwrap_or_default(),
            created_at: lenient(field("createdAt")),
            updated_at: lenient(field("updatedAt")),
        };
    }

    /// Serialize to a JSON snapshot
    pub fn to_value(&self) -> Value {
        // Serializing plain data with string keys cannot fail
        serde_json::to_value(self).unwrap_or(Value::Null)
    }

    /// Set the document metadata; the session adopts the document id
    pub fn set_pdf_meta(&mut self, meta: DocumentMeta) {
        self.id = Some(meta.id.clone());
        self.pdf_meta = Some(meta);
        self.touch();
    }

    /// Set the extracted source text and chunks
    pub fn set_source_text(&mut self, text: impl Into<String>, chunks: Vec<String>, page_count: usize) {
        self.raw_text = text.into();
        self.chunk_count = chunks.len();
        self.source_chunks = chunks;
        self.page_count = page_count;
        self.touch();
    }

    /// Replace the summary
    pub fn set_summary(&mut self, summary: impl Into<String>) {
        self.summary = summary.into();
        self.touch();
    }

    /// Replace the quiz; resets position and completion
    pub fn set_quiz_items(&mut self, items: Vec<QuizItem>) {
        self.quiz_items = items;
        self.quiz_index = 0;
        self.quiz_completed = false;
        self.touch();
    }

    /// Replace the flashcards; resets position
    pub fn set_flashcards(&mut self, cards: Vec<Flashcard>) {
        self.flashcards = cards;
        self.flashcard_index = 0;
        self.touch();
    }

    /// Move within the quiz, clamped to the available items
    pub fn set_quiz_index(&mut self, index: usize) {
        self.quiz_index = index.min(self.quiz_items.len().saturating_sub(1));
        self.touch();
    }

    /// Mark the quiz as finished or not
    pub fn set_quiz_completed(&mut self, completed: bool) {
        self.quiz_completed = completed;
        self.touch();
    }

    /// Move within the flashcards, clamped to the available cards
    pub fn set_flashcard_index(&mut self, index: usize) {
        self.flashcard_index = index.min(self.flashcards.len().saturating_sub(1));
        self.touch();
    }

    /// Record a mutation at the current time
    pub fn touch(&mut self) {
        self.touch_at(now_millis());
    }

    /// Record a mutation at an explicit time
    pub fn touch_at(&mut self, timestamp_ms: u64) {
        self.updated_at = Some(timestamp_ms);
        if self.created_at.is_none() {
            self.created_at = Some(timestamp_ms);
        }
    }

    /// Whether any study material has been generated
    pub fn has_material(&self) -> bool {
        !self.summary.is_empty() || !self.quiz_items.is_empty() || !self.flashcards.is_empty()
    }
}

fn lenient<T: DeserializeOwned>(value: Option<&Value>) -> Option<T> {
    value.and_then(|v| serde_json::from_value(v.clone()).ok())
}

/// Decode each array entry on its own, skipping unreadable ones
fn lenient_items<T: DeserializeOwned>(value: Option<&Value>) -> Vec<T> {
    match value {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(|item| serde_json::from_value(item.clone()).ok())
            .collect(),
        _ => Vec::new(),
    }
}

fn truthy(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
        Value::Null => false,
    }
}

fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
