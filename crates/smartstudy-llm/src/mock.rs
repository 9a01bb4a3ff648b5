//! Mock runtime for deterministic testing
//!
//! Returns scripted responses without loading any model. Responses are
//! served first-in first-out from a queue; once the queue is empty every
//! prompt receives the default response.

use crate::runtime::{
    Availability, FragmentStream, ModelRuntime, ModelSession, ProgressSink, PromptRequest,
};
use crate::LlmError;
use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

/// A prompt received by a mock session
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedPrompt {
    /// Prompt text
    pub prompt: String,

    /// Schema constraint, if one was supplied
    pub schema: Option<Value>,
}

#[derive(Debug, Default)]
struct MockState {
    responses: VecDeque<Result<String, LlmError>>,
    prompts: Vec<RecordedPrompt>,
    sessions_created: usize,
    sessions_destroyed: usize,
}

/// Mock model runtime
///
/// Clones share the same response queue and counters.
///
/// # Examples
///
/// ```
/// use smartstudy_llm::MockRuntime;
///
/// let runtime = MockRuntime::new("[]").streaming(4);
/// runtime.push_response(r#"{"summary": "A short summary."}"#);
/// assert_eq!(runtime.call_count(), 0);
/// ```
#[derive(Debug, Clone)]
pub struct MockRuntime {
    name: String,
    default_response: String,
    availability: Availability,
    present: bool,
    fragment_size: Option<usize>,
    fragment_delay: Option<Duration>,
    state: Arc<Mutex<MockState>>,
}

impl MockRuntime {
    /// Create a runtime that answers every prompt with `response`
    pub fn new(response: impl Into<String>) -> Self {
        Self {
            name: "mock".to_string(),
            default_response: response.into(),
            availability: Availability::Available,
            present: true,
            fragment_size: None,
            fragment_delay: None,
            state: Arc::new(Mutex::new(MockState::default())),
        }
    }

    /// Override the runtime name
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Report the given availability
    pub fn with_availability(mut self, availability: Availability) -> Self {
        self.availability = availability;
        self
    }

    /// Report the runtime as absent from the environment
    pub fn absent(mut self) -> Self {
        self.present = false;
        self
    }

    /// Deliver responses in fragments of `size` characters
    pub fn streaming(mut self, size: usize) -> Self {
        self.fragment_size = Some(size.max(1));
        self
    }

    /// Wait before delivering each fragment
    pub fn with_fragment_delay(mut self, delay: Duration) -> Self {
        self.fragment_delay = Some(delay);
        self
    }

    /// Queue a response for the next unanswered prompt
    pub fn push_response(&self, response: impl Into<String>) {
        self.state().responses.push_back(Ok(response.into()));
    }

    /// Queue a failure for the next unanswered prompt
    pub fn push_error(&self, error: LlmError) {
        self.state().responses.push_back(Err(error));
    }

    /// Prompts received so far, in order
    pub fn prompts(&self) -> Vec<RecordedPrompt> {
        self.state().prompts.clone()
    }

    /// Number of prompts received
    pub fn call_count(&self) -> usize {
        self.state().prompts.len()
    }

    /// Forget recorded prompts
    pub fn reset_call_count(&self) {
        self.state().prompts.clear();
    }

    /// Number of sessions created
    pub fn sessions_created(&self) -> usize {
        self.state().sessions_created
    }

    /// Number of sessions destroyed
    pub fn sessions_destroyed(&self) -> usize {
        self.state().sessions_destroyed
    }

    fn state(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn next_response(&self, request: PromptRequest) -> Result<String, LlmError> {
        let mut state = self.state();
        state.prompts.push(RecordedPrompt {
            prompt: request.prompt,
            schema: request.schema,
        });
        state
            .responses
            .pop_front()
            .unwrap_or_else(|| Ok(self.default_response.clone()))
    }

    fn fragments(&self, text: &str) -> Vec<String> {
        match self.fragment_size {
            Some(size) => {
                let chars: Vec<char> = text.chars().collect();
                chars.chunks(size).map(|c| c.iter().collect()).collect()
            }
            None => vec![text.to_string()],
        }
    }
}

impl Default for MockRuntime {
    fn default() -> Self {
        Self::new("Default mock response")
    }
}

#[async_trait]
impl ModelRuntime for MockRuntime {
    fn name(&self) -> &str {
        &self.name
    }

    fn is_present(&self) -> bool {
        self.present
    }

    async fn availability(&self) -> Result<Availability, LlmError> {
        Ok(self.availability)
    }

    async fn create_session(
        &self,
        progress: Option<ProgressSink>,
    ) -> Result<Arc<dyn ModelSession>, LlmError> {
        match self.availability {
            Availability::Unavailable => {
                return Err(LlmError::Unavailable(format!("{} has no model", self.name)));
            }
            Availability::Downloadable | Availability::Downloading => {
                if let Some(sink) = progress {
                    for percent in [0u8, 50, 100] {
                        let _ = sink.send(percent);
                    }
                }
            }
            Availability::Available => {}
        }

        self.state().sessions_created += 1;
        Ok(Arc::new(MockSession {
            runtime: self.clone(),
        }))
    }
}

/// Session handed out by [`MockRuntime`]
struct MockSession {
    runtime: MockRuntime,
}

#[async_trait]
impl ModelSession for MockSession {
    async fn prompt(&self, request: PromptRequest) -> Result<FragmentStream, LlmError> {
        let response = self.runtime.next_response(request)?;
        let fragments = self.runtime.fragments(&response);
        let delay = self.runtime.fragment_delay;

        let stream = stream::iter(fragments).then(move |fragment| async move {
            if let Some(delay) = delay {
                tokio::time::sleep(delay).await;
            }
            Ok(fragment)
        });

        Ok(Box::pin(stream))
    }

    async fn destroy(&self) -> Result<(), LlmError> {
        self.runtime.state().sessions_destroyed += 1;
        Ok(())
    }
}
