//! Error types for study material generation

use smartstudy_llm::LlmError;
use thiserror::Error;

/// Errors that can occur while generating study material
///
/// Malformed model output is never an error: normalization degrades to
/// empty results instead.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GeneratorError {
    /// No usable model runtime, or the device cannot serve the model
    #[error("{0}")]
    Unavailable(String),

    /// The run's cancel token fired; not a failure
    #[error("Generation cancelled")]
    Cancelled,

    /// The summary normalized to nothing
    #[error("Summary generation returned no content.")]
    EmptySummary,

    /// Any other model runtime failure
    #[error("Model error: {0}")]
    Model(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}

impl GeneratorError {
    /// Whether this is a cancellation rather than a failure
    pub fn is_cancelled(&self) -> bool {
        matches!(self, GeneratorError::Cancelled)
    }
}

impl From<LlmError> for GeneratorError {
    fn from(e: LlmError) -> Self {
        match e {
            LlmError::Unavailable(msg) => GeneratorError::Unavailable(msg),
            LlmError::Cancelled => GeneratorError::Cancelled,
            other => GeneratorError::Model(other.to_string()),
        }
    }
}

impl From<toml::de::Error> for GeneratorError {
    fn from(e: toml::de::Error) -> Self {
        GeneratorError::Config(e.to_string())
    }
}
