//! Smart Study Generator
//!
//! Turns extracted document text into study material using a local
//! language model: a short summary, a multiple-choice quiz and a set of
//! flashcards.
//!
//! # Overview
//!
//! Model output is untrusted. Every response goes through the same path:
//! parse leniently, normalize into the canonical shapes, then truncate to
//! the requested count. Malformed output yields fewer items rather than an
//! error; only an unusable runtime, cancellation, an empty summary and
//! runtime failures surface as [`GeneratorError`].
//!
//! # Architecture
//!
//! ```text
//! text → context → PromptBuilder → SessionManager → model
//!                                                     ↓
//!   StudySession ← StudyPipeline ← normalize ← parse ←┘
//! ```
//!
//! - [`SessionManager`] owns the single shared model session
//! - [`Generator`] runs one stage against that session
//! - [`StudyPipeline`] runs summary → quiz → flashcards for an upload and
//!   persists the results through a [`SessionPersistence`](smartstudy_domain::SessionPersistence)
//!
//! # Example Usage
//!
//! ```no_run
//! use smartstudy_domain::DocumentMeta;
//! use smartstudy_generator::{GenerationRequest, Generator, SessionManager};
//! use smartstudy_llm::MockRuntime;
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), smartstudy_generator::GeneratorError> {
//! let runtime = MockRuntime::new(r#"{"summary": "Cells divide by mitosis."}"#);
//! let generator = Generator::new(SessionManager::with_runtime(Arc::new(runtime)));
//!
//! let meta = DocumentMeta::new("hash", "biology.pdf", 1024, 0, "application/pdf");
//! let request = GenerationRequest::new("Cells divide by mitosis.", Vec::new(), 1, meta);
//!
//! let summary = generator.generate_summary(&request, None).await?;
//! println!("{}", summary);
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]

mod cancel;
mod chunking;
mod config;
mod document;
mod error;
mod events;
mod generator;
mod pipeline;
mod session;
mod types;

pub mod context;
pub mod normalize;
pub mod parser;
pub mod prompt;
pub mod schema;

#[cfg(test)]
mod tests;

pub use cancel::CancelToken;
pub use chunking::TextChunker;
pub use config::{
    clamp_item_count, CountMode, CountSetting, GeneratorConfig, StudySettings, MAX_ITEM_COUNT,
    MIN_ITEM_COUNT,
};
pub use document::{content_hash, document_meta};
pub use error::GeneratorError;
pub use events::{EventSink, GenerationEvent, PipelineEvent};
pub use generator::Generator;
pub use pipeline::{PipelineOutcome, PipelineSink, StudyPipeline, StudyUpload, SAVE_FAILED_NOTE};
pub use prompt::{normalize_desired_count, parse_desired_count, PromptBuilder};
pub use schema::SchemaKind;
pub use session::{SessionManager, MODEL_UNAVAILABLE, RUNTIME_MISSING};
pub use types::{DocumentContext, GenerationRequest};
