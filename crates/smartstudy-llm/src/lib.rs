//! Smart Study Model Runtime Layer
//!
//! Pluggable language-model runtimes behind a common session interface.
//!
//! # Architecture
//!
//! A [`ModelRuntime`] reports whether it is present and whether its model is
//! available, and creates [`ModelSession`]s. A session answers a
//! [`PromptRequest`] with a [`FragmentStream`]: a finite, non-restartable
//! sequence of text fragments. Runtimes that can only answer in one shot
//! return a single-fragment stream, so callers consume both the same way.
//! Dropping the stream aborts the generation.
//!
//! # Runtimes
//!
//! - `MockRuntime`: Deterministic scripted runtime for testing
//! - `OllamaRuntime`: Local Ollama API integration
//!
//! # Examples
//!
//! ```
//! use futures::StreamExt;
//! use smartstudy_llm::{MockRuntime, ModelRuntime, PromptRequest};
//!
//! # async fn example() -> Result<(), smartstudy_llm::LlmError> {
//! let runtime = MockRuntime::new("Hello from the model!");
//! let session = runtime.create_session(None).await?;
//! let mut stream = session.prompt(PromptRequest::new("test prompt")).await?;
//!
//! let mut text = String::new();
//! while let Some(fragment) = stream.next().await {
//!     text.push_str(&fragment?);
//! }
//! assert_eq!(text, "Hello from the model!");
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]

pub mod mock;
pub mod ollama;
pub mod runtime;

use thiserror::Error;

pub use mock::{MockRuntime, RecordedPrompt};
pub use ollama::OllamaRuntime;
pub use runtime::{
    Availability, FragmentStream, ModelRuntime, ModelSession, ProgressSink, PromptRequest,
};

/// Errors that can occur during model runtime operations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LlmError {
    /// Network or API communication error
    #[error("Communication error: {0}")]
    Communication(String),

    /// Invalid response from the runtime
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// Requested model is not installed on the runtime
    #[error("Model not available: {0}")]
    ModelNotAvailable(String),

    /// Runtime missing or device incapable
    #[error("Runtime unavailable: {0}")]
    Unavailable(String),

    /// Generation aborted by the caller
    #[error("Generation cancelled")]
    Cancelled,

    /// Generic error
    #[error("LLM error: {0}")]
    Other(String),
}

impl From<reqwest::Error> for LlmError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            LlmError::InvalidResponse(e.to_string())
        } else {
            LlmError::Communication(e.to_string())
        }
    }
}
