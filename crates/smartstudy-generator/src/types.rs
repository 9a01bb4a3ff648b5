//! Request and context types for generation

use crate::cancel::CancelToken;
use smartstudy_domain::DocumentMeta;

/// Request to generate one kind of study material
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    /// Full extracted document text
    pub document_text: String,

    /// Ordered text chunks
    pub chunks: Vec<String>,

    /// Number of pages in the source document
    pub page_count: usize,

    /// Source document metadata
    pub meta: DocumentMeta,

    /// Requested number of items (1-20); `None` lets the model decide
    pub desired_count: Option<u32>,

    /// Summary produced by an earlier stage, cited by quiz and flashcard prompts
    pub summary: Option<String>,

    /// Cancellation signal for the run this request belongs to
    pub cancel: CancelToken,
}

impl GenerationRequest {
    /// Create a request with no count, no prior summary and a fresh token
    pub fn new(
        document_text: impl Into<String>,
        chunks: Vec<String>,
        page_count: usize,
        meta: DocumentMeta,
    ) -> Self {
        Self {
            document_text: document_text.into(),
            chunks,
            page_count,
            meta,
            desired_count: None,
            summary: None,
            cancel: CancelToken::new(),
        }
    }

    /// Request a specific number of items
    pub fn with_desired_count(mut self, desired_count: Option<u32>) -> Self {
        self.desired_count = desired_count;
        self
    }

    /// Cite a previously generated summary
    pub fn with_summary(mut self, summary: impl Into<String>) -> Self {
        self.summary = Some(summary.into());
        self
    }

    /// Bind the request to a run's cancel token
    pub fn with_cancel(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }
}

/// Lightweight context derived from the document for prompting
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DocumentContext {
    /// Extractive summary built from the leading sentences
    pub summary_excerpt: String,

    /// Frequency-ranked key terms
    pub key_terms: Vec<String>,

    /// Leading chunks, quoted verbatim in prompts
    pub preview_text: String,

    /// Number of chunks
    pub chunk_count: usize,

    /// Number of pages
    pub page_count: usize,
}
