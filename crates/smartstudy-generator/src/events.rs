//! Status events emitted during generation

use smartstudy_domain::{Stage, StepState};
use tokio::sync::mpsc::UnboundedSender;

/// Progress reported by the generator
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GenerationEvent {
    /// Human-readable status line
    Status(String),

    /// Model download progress, 0-100
    DownloadProgress(u8),
}

/// Sink for generation events; sending never blocks
pub type EventSink = UnboundedSender<GenerationEvent>;

/// Progress reported by the upload pipeline
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PipelineEvent {
    /// Forwarded generator event for a stage
    Generation(Stage, GenerationEvent),

    /// A stage changed state
    Step(Stage, StepState),

    /// Advisory note that does not affect the run
    Note(String),
}

/// Send a status line, ignoring a closed receiver
pub(crate) fn emit_status(events: Option<&EventSink>, message: &str) {
    if let Some(sink) = events {
        let _ = sink.send(GenerationEvent::Status(message.to_string()));
    }
}

/// Send download progress, ignoring a closed receiver
pub(crate) fn emit_progress(events: Option<&EventSink>, percent: u8) {
    if let Some(sink) = events {
        let _ = sink.send(GenerationEvent::DownloadProgress(percent.min(100)));
    }
}
