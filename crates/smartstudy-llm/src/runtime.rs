//! Runtime and session traits

use crate::LlmError;
use async_trait::async_trait;
use futures::Stream;
use serde_json::Value;
use std::pin::Pin;
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedSender;

/// Stream of generated text fragments
///
/// Finite: ends when generation completes. Not restartable. Dropping it
/// aborts the in-flight generation.
pub type FragmentStream = Pin<Box<dyn Stream<Item = Result<String, LlmError>> + Send>>;

/// Receives model download progress as a percentage (0-100)
pub type ProgressSink = UnboundedSender<u8>;

/// Whether the runtime can serve its model
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Availability {
    /// The runtime cannot serve the model on this device
    Unavailable,

    /// The model must be downloaded before a session can be created
    Downloadable,

    /// A download is already in progress
    Downloading,

    /// Ready to create sessions
    Available,
}

impl Availability {
    /// Get the availability name as a string
    pub fn as_str(&self) -> &'static str {
        match self {
            Availability::Unavailable => "unavailable",
            Availability::Downloadable => "downloadable",
            Availability::Downloading => "downloading",
            Availability::Available => "available",
        }
    }
}

/// A prompt with an optional structured-output constraint
#[derive(Debug, Clone, PartialEq)]
pub struct PromptRequest {
    /// Prompt text
    pub prompt: String,

    /// JSON schema the output must satisfy, if any
    pub schema: Option<Value>,
}

impl PromptRequest {
    /// Create an unconstrained request
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            schema: None,
        }
    }

    /// Constrain the output with a JSON schema
    pub fn with_schema(mut self, schema: Value) -> Self {
        self.schema = Some(schema);
        self
    }
}

/// A stateful handle to a loaded model
#[async_trait]
pub trait ModelSession: Send + Sync {
    /// Issue a prompt and stream back the generated text
    async fn prompt(&self, request: PromptRequest) -> Result<FragmentStream, LlmError>;

    /// Release the session's resources
    async fn destroy(&self) -> Result<(), LlmError>;
}

/// A language model runtime that can create sessions
#[async_trait]
pub trait ModelRuntime: Send + Sync {
    /// Short name used in logs
    fn name(&self) -> &str;

    /// Whether this runtime exists in the current environment
    fn is_present(&self) -> bool {
        true
    }

    /// Check whether the model can be served
    async fn availability(&self) -> Result<Availability, LlmError>;

    /// Create a session, downloading the model first if needed
    ///
    /// Download progress, if any, is reported to `progress`.
    async fn create_session(
        &self,
        progress: Option<ProgressSink>,
    ) -> Result<Arc<dyn ModelSession>, LlmError>;
}
