//! Ollama Runtime Implementation
//!
//! Provides integration with Ollama's local LLM API, so study material is
//! generated on the user's own machine.
//!
//! # Features
//!
//! - Availability probing via `/api/tags`
//! - Model download with progress via `/api/pull`
//! - Streaming generation via `/api/generate`, with JSON-schema `format`
//!   constraints for structured output
//! - Retry logic with exponential backoff when starting a request
//!
//! # Examples
//!
//! ```no_run
//! use smartstudy_llm::OllamaRuntime;
//!
//! // Create an Ollama runtime
//! let runtime = OllamaRuntime::new("http://localhost:11434", "llama3.2");
//! ```

use crate::runtime::{
    Availability, FragmentStream, ModelRuntime, ModelSession, ProgressSink, PromptRequest,
};
use crate::LlmError;
use async_trait::async_trait;
use futures::stream::{self, Stream, StreamExt};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::VecDeque;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Default Ollama API endpoint
pub const DEFAULT_ENDPOINT: &str = "http://localhost:11434";

/// Default timeout for establishing a connection (seconds)
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;

/// Default number of retry attempts
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Ollama API runtime for local inference
pub struct OllamaRuntime {
    endpoint: String,
    model: String,
    client: reqwest::Client,
    max_retries: u32,
    pulling: Arc<AtomicBool>,
}

/// Request body for Ollama generate API
#[derive(Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    format: Option<&'a Value>,
}

/// One line of a streamed generate response
#[derive(Deserialize)]
struct GenerateChunk {
    #[serde(default)]
    response: String,
    #[serde(default)]
    error: Option<String>,
}

/// Request body for Ollama pull API
#[derive(Serialize)]
struct PullRequest<'a> {
    model: &'a str,
    stream: bool,
}

/// One line of a streamed pull response
#[derive(Deserialize)]
struct PullChunk {
    #[serde(default)]
    status: String,
    #[serde(default)]
    total: Option<u64>,
    #[serde(default)]
    completed: Option<u64>,
    #[serde(default)]
    error: Option<String>,
}

/// Response from Ollama tags API
#[derive(Deserialize)]
struct TagsResponse {
    #[serde(default)]
    models: Vec<ModelTag>,
}

#[derive(Deserialize)]
struct ModelTag {
    name: String,
}

impl OllamaRuntime {
    /// Create a new Ollama runtime
    ///
    /// # Parameters
    ///
    /// - `endpoint`: Ollama API endpoint (e.g., "http://localhost:11434")
    /// - `model`: Model to use (e.g., "llama3.2", "mistral")
    pub fn new(endpoint: impl Into<String>, model: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(DEFAULT_CONNECT_TIMEOUT_SECS))
            .build()
            .unwrap_or_default();

        Self {
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            model: model.into(),
            client,
            max_retries: DEFAULT_MAX_RETRIES,
            pulling: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Create a new Ollama runtime on the default local endpoint
    pub fn default_endpoint(model: impl Into<String>) -> Self {
        Self::new(DEFAULT_ENDPOINT, model)
    }

    /// Set the maximum number of retry attempts
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries.max(1);
        self
    }

    /// Configured model name
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Whether the runtime has the configured model installed
    async fn has_model(&self) -> Result<bool, LlmError> {
        let url = format!("{}/api/tags", self.endpoint);
        let response = send_with_retry(self.max_retries, || self.client.get(&url)).await?;
        let tags: TagsResponse = response.json().await?;
        Ok(tags.models.iter().any(|tag| model_matches(&tag.name, &self.model)))
    }

    /// Download the model, reporting progress percentages
    async fn pull(&self, progress: Option<&ProgressSink>) -> Result<(), LlmError> {
        info!("Pulling model '{}' from {}", self.model, self.endpoint);
        self.pulling.store(true, Ordering::SeqCst);

        let result = async {
            let url = format!("{}/api/pull", self.endpoint);
            let body = PullRequest {
                model: &self.model,
                stream: true,
            };
            let response =
                send_with_retry(self.max_retries, || self.client.post(&url).json(&body)).await?;

            let mut lines = ndjson_lines(response.bytes_stream());
            while let Some(line) = lines.next().await {
                let chunk: PullChunk = serde_json::from_str(&line?)
                    .map_err(|e| LlmError::InvalidResponse(format!("Bad pull progress: {}", e)))?;
                if let Some(error) = chunk.error {
                    return Err(LlmError::ModelNotAvailable(error));
                }
                if let (Some(total), Some(completed), Some(sink)) = (chunk.total, chunk.completed, progress) {
                    if total > 0 {
                        let percent = ((completed as f64 / total as f64) * 100.0).round() as u8;
                        let _ = sink.send(percent.min(100));
                    }
                }
                debug!("Pull status: {}", chunk.status);
            }
            Ok::<(), LlmError>(())
        }
        .await;

        self.pulling.store(false, Ordering::SeqCst);
        result
    }
}

#[async_trait]
impl ModelRuntime for OllamaRuntime {
    fn name(&self) -> &str {
        "ollama"
    }

    fn is_present(&self) -> bool {
        !self.endpoint.is_empty() && !self.model.is_empty()
    }

    async fn availability(&self) -> Result<Availability, LlmError> {
        if self.pulling.load(Ordering::SeqCst) {
            return Ok(Availability::Downloading);
        }
        match self.has_model().await {
            Ok(true) => Ok(Availability::Available),
            Ok(false) => Ok(Availability::Downloadable),
            Err(e) => {
                warn!("Ollama at {} is not reachable: {}", self.endpoint, e);
                Ok(Availability::Unavailable)
            }
        }
    }

    async fn create_session(
        &self,
        progress: Option<ProgressSink>,
    ) -> Result<Arc<dyn ModelSession>, LlmError> {
        if !self.has_model().await? {
            self.pull(progress.as_ref()).await?;
        }

        Ok(Arc::new(OllamaSession {
            endpoint: self.endpoint.clone(),
            model: self.model.clone(),
            client: self.client.clone(),
            max_retries: self.max_retries,
        }))
    }
}

/// Session bound to one Ollama model
struct OllamaSession {
    endpoint: String,
    model: String,
    client: reqwest::Client,
    max_retries: u32,
}

#[async_trait]
impl ModelSession for OllamaSession {
    async fn prompt(&self, request: PromptRequest) -> Result<FragmentStream, LlmError> {
        let url = format!("{}/api/generate", self.endpoint);
        let body = GenerateRequest {
            model: &self.model,
            prompt: &request.prompt,
            stream: true,
            format: request.schema.as_ref(),
        };

        let response = send_with_retry(self.max_retries, || self.client.post(&url).json(&body))
            .await
            .map_err(|e| match e {
                LlmError::Communication(msg) if msg.starts_with("HTTP 404") => {
                    LlmError::ModelNotAvailable(self.model.clone())
                }
                other => other,
            })?;

        let fragments = ndjson_lines(response.bytes_stream()).filter_map(|line| async move {
            match line {
                Ok(line) => parse_generate_line(&line),
                Err(e) => Some(Err(e)),
            }
        });

        Ok(Box::pin(fragments))
    }

    async fn destroy(&self) -> Result<(), LlmError> {
        // Ollama keeps models warm on its own schedule; nothing to release per session
        Ok(())
    }
}

/// Send a request, retrying transport failures and server errors
///
/// Exponential backoff: 1s, 2s, 4s, etc. Client errors are not retried.
async fn send_with_retry<F>(max_retries: u32, build: F) -> Result<reqwest::Response, LlmError>
where
    F: Fn() -> reqwest::RequestBuilder,
{
    let mut attempts = 0;
    let mut last_error = None;

    while attempts < max_retries {
        match build().send().await {
            Ok(response) if response.status().is_success() => return Ok(response),
            Ok(response) => {
                let status = response.status();
                let error_text = response
                    .text()
                    .await
                    .unwrap_or_else(|_| "Unknown error".to_string());
                let error = LlmError::Communication(format!("HTTP {}: {}", status.as_u16(), error_text));
                if status.is_client_error() {
                    return Err(error);
                }
                last_error = Some(error);
            }
            Err(e) => {
                last_error = Some(LlmError::Communication(format!("Request failed: {}", e)));
            }
        }

        attempts += 1;
        if attempts < max_retries {
            let delay = Duration::from_secs(2u64.pow(attempts - 1));
            tokio::time::sleep(delay).await;
        }
    }

    Err(last_error.unwrap_or_else(|| LlmError::Communication("Max retries exceeded".to_string())))
}

/// Split a byte stream into newline-delimited lines
///
/// Lines are assembled from raw bytes so multi-byte characters split across
/// network chunks stay intact. A trailing line without a newline is emitted
/// when the stream ends.
fn ndjson_lines<S, B>(bytes: S) -> Pin<Box<dyn Stream<Item = Result<String, LlmError>> + Send>>
where
    S: Stream<Item = Result<B, reqwest::Error>> + Send + 'static,
    B: AsRef<[u8]> + Send + 'static,
{
    struct LineState<S> {
        bytes: Pin<Box<S>>,
        buffer: Vec<u8>,
        pending: VecDeque<Result<String, LlmError>>,
        finished: bool,
    }

    let state = LineState {
        bytes: Box::pin(bytes),
        buffer: Vec::new(),
        pending: VecDeque::new(),
        finished: false,
    };

    let lines = stream::unfold(state, |mut state| async move {
        loop {
            if let Some(item) = state.pending.pop_front() {
                return Some((item, state));
            }
            if state.finished {
                return None;
            }
            match state.bytes.next().await {
                Some(Ok(chunk)) => {
                    state.buffer.extend_from_slice(chunk.as_ref());
                    while let Some(pos) = state.buffer.iter().position(|b| *b == b'\n') {
                        let line: Vec<u8> = state.buffer.drain(..=pos).collect();
                        push_line(&mut state.pending, &line);
                    }
                }
                Some(Err(e)) => {
                    state.finished = true;
                    state.pending.push_back(Err(LlmError::Communication(format!("Stream error: {}", e))));
                }
                None => {
                    state.finished = true;
                    let rest = std::mem::take(&mut state.buffer);
                    push_line(&mut state.pending, &rest);
                }
            }
        }
    });

    Box::pin(lines)
}

fn push_line(pending: &mut VecDeque<Result<String, LlmError>>, raw: &[u8]) {
    let line = String::from_utf8_lossy(raw).trim().to_string();
    if !line.is_empty() {
        pending.push_back(Ok(line));
    }
}

/// Parse one generate line into a fragment; empty fragments are skipped
fn parse_generate_line(line: &str) -> Option<Result<String, LlmError>> {
    match serde_json::from_str::<GenerateChunk>(line) {
        Ok(chunk) => {
            if let Some(error) = chunk.error {
                return Some(Err(LlmError::Other(error)));
            }
            if chunk.response.is_empty() {
                None
            } else {
                Some(Ok(chunk.response))
            }
        }
        Err(e) => Some(Err(LlmError::InvalidResponse(format!(
            "Failed to parse stream chunk: {}",
            e
        )))),
    }
}

/// Ollama reports untagged models as `name:latest`
fn model_matches(installed: &str, wanted: &str) -> bool {
    installed == wanted
        || installed.strip_suffix(":latest") == Some(wanted)
        || wanted.strip_suffix(":latest") == Some(installed)
}
