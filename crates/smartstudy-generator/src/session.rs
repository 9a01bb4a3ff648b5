//! Ownership of the shared model session

use crate::cancel::CancelToken;
use crate::error::GeneratorError;
use crate::events::{emit_progress, emit_status, EventSink};
use smartstudy_llm::{Availability, LlmError, ModelRuntime, ModelSession};
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};
use tracing::{debug, info, warn};

/// Error when no candidate runtime is present
pub const RUNTIME_MISSING: &str = "Prompt API is not available in this context.";

/// Error when the resolved runtime cannot serve its model
pub const MODEL_UNAVAILABLE: &str = "Language model is unavailable on this device.";

/// Status while the model is being downloaded for the first time
pub const STATUS_DOWNLOADING: &str = "Downloading language model…";

/// Status while an earlier download is still running
pub const STATUS_DOWNLOAD_IN_PROGRESS: &str = "Language model download in progress…";

/// Status while a session is prepared
pub const STATUS_PREPARING: &str = "Preparing language model session…";

#[derive(Default)]
struct SessionState {
    runtime: Option<Arc<dyn ModelRuntime>>,
    session: Option<Arc<dyn ModelSession>>,
}

/// Owner of the process-wide model session
///
/// Holds an ordered list of candidate runtimes. The first one that reports
/// itself present is used for the life of the manager. At most one session
/// exists at a time; concurrent callers wait on the same creation and share
/// the result.
pub struct SessionManager {
    candidates: Vec<Arc<dyn ModelRuntime>>,
    state: Mutex<SessionState>,
}

impl SessionManager {
    /// Create a manager over candidate runtimes, in priority order
    pub fn new(candidates: Vec<Arc<dyn ModelRuntime>>) -> Self {
        Self {
            candidates,
            state: Mutex::new(SessionState::default()),
        }
    }

    /// Create a manager over a single runtime
    pub fn with_runtime(runtime: Arc<dyn ModelRuntime>) -> Self {
        Self::new(vec![runtime])
    }

    /// Name of the runtime in use, once resolved
    pub async fn runtime_name(&self) -> Option<String> {
        let state = self.state.lock().await;
        state.runtime.as_ref().map(|runtime| runtime.name().to_string())
    }

    /// Whether a session is currently held
    pub async fn has_session(&self) -> bool {
        self.state.lock().await.session.is_some()
    }

    /// Get the shared session, creating it if needed
    ///
    /// Emits a status describing the model's availability on every call,
    /// and forwards download progress while a session is being created.
    pub async fn ensure_session(
        &self,
        events: Option<&EventSink>,
        cancel: &CancelToken,
    ) -> Result<Arc<dyn ModelSession>, GeneratorError> {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(GeneratorError::Cancelled),
            result = self.acquire(events) => result,
        }
    }

    async fn acquire(&self, events: Option<&EventSink>) -> Result<Arc<dyn ModelSession>, GeneratorError> {
        // Held across creation so concurrent callers share one session
        let mut state = self.state.lock().await;

        let runtime = match state.runtime.clone() {
            Some(runtime) => runtime,
            None => {
                let runtime = self.resolve_runtime()?;
                state.runtime = Some(Arc::clone(&runtime));
                runtime
            }
        };

        let availability = runtime.availability().await.map_err(|e| {
            warn!("Availability check failed on {}: {}", runtime.name(), e);
            GeneratorError::Unavailable(MODEL_UNAVAILABLE.to_string())
        })?;
        debug!("{} reports model {}", runtime.name(), availability.as_str());

        match availability {
            Availability::Unavailable => {
                return Err(GeneratorError::Unavailable(MODEL_UNAVAILABLE.to_string()));
            }
            Availability::Downloadable => {
                emit_status(events, STATUS_DOWNLOADING);
                emit_progress(events, 0);
            }
            Availability::Downloading => {
                emit_status(events, STATUS_DOWNLOAD_IN_PROGRESS);
                emit_progress(events, 0);
            }
            Availability::Available => emit_status(events, STATUS_PREPARING),
        }

        if let Some(session) = &state.session {
            debug!("Reusing model session");
            return Ok(Arc::clone(session));
        }

        info!("Creating model session on {}", runtime.name());
        let session = self.create_session(runtime.as_ref(), events).await?;
        state.session = Some(Arc::clone(&session));
        Ok(session)
    }

    fn resolve_runtime(&self) -> Result<Arc<dyn ModelRuntime>, GeneratorError> {
        self.candidates
            .iter()
            .find(|runtime| runtime.is_present())
            .cloned()
            .ok_or_else(|| GeneratorError::Unavailable(RUNTIME_MISSING.to_string()))
    }

    async fn create_session(
        &self,
        runtime: &dyn ModelRuntime,
        events: Option<&EventSink>,
    ) -> Result<Arc<dyn ModelSession>, GeneratorError> {
        let (progress_tx, mut progress_rx) = mpsc::unbounded_channel::<u8>();

        let forward = async {
            while let Some(percent) = progress_rx.recv().await {
                emit_progress(events, percent);
            }
        };
        // The sender moves into the runtime, so `forward` ends with creation
        let (result, ()) = tokio::join!(runtime.create_session(Some(progress_tx)), forward);

        result.map_err(|e| {
            warn!("Session creation failed on {}: {}", runtime.name(), e);
            match e {
                LlmError::Unavailable(_) => {
                    GeneratorError::Unavailable(MODEL_UNAVAILABLE.to_string())
                }
                other => GeneratorError::from(other),
            }
        })
    }

    /// Destroy the held session, if any
    ///
    /// Destroy failures are logged and ignored; the handle is cleared either way.
    pub async fn destroy_session(&self) {
        let session = self.state.lock().await.session.take();
        if let Some(session) = session {
            if let Err(e) = session.destroy().await {
                warn!("Failed to destroy session: {}", e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::GenerationEvent;
    use smartstudy_llm::MockRuntime;

    fn drain(rx: &mut mpsc::UnboundedReceiver<GenerationEvent>) -> Vec<GenerationEvent> {
        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }
        events
    }

    #[tokio::test]
    async fn test_no_present_runtime() {
        let manager = SessionManager::new(vec![Arc::new(MockRuntime::default().absent())]);
        let result = manager.ensure_session(None, &CancelToken::new()).await;
        assert_eq!(result.err(), Some(GeneratorError::Unavailable(RUNTIME_MISSING.to_string())));
    }

    #[tokio::test]
    async fn test_first_present_runtime_wins() {
        let first = MockRuntime::default().named("first").absent();
        let second = MockRuntime::default().named("second");
        let third = MockRuntime::default().named("third");
        let manager = SessionManager::new(vec![
            Arc::new(first),
            Arc::new(second.clone()),
            Arc::new(third.clone()),
        ]);

        manager.ensure_session(None, &CancelToken::new()).await.unwrap();
        assert_eq!(manager.runtime_name().await.as_deref(), Some("second"));
        assert_eq!(second.sessions_created(), 1);
        assert_eq!(third.sessions_created(), 0);
    }

    #[tokio::test]
    async fn test_unavailable_model_is_fatal() {
        let runtime = MockRuntime::default().with_availability(Availability::Unavailable);
        let manager = SessionManager::with_runtime(Arc::new(runtime));
        let result = manager.ensure_session(None, &CancelToken::new()).await;
        let err = result.err().unwrap();
        assert_eq!(err, GeneratorError::Unavailable(MODEL_UNAVAILABLE.to_string()));
        assert_eq!(err.to_string(), "Language model is unavailable on this device.");
    }

    #[tokio::test]
    async fn test_session_is_reused() {
        let runtime = MockRuntime::default();
        let manager = SessionManager::with_runtime(Arc::new(runtime.clone()));
        let cancel = CancelToken::new();

        manager.ensure_session(None, &cancel).await.unwrap();
        manager.ensure_session(None, &cancel).await.unwrap();
        assert_eq!(runtime.sessions_created(), 1);
        assert!(manager.has_session().await);
    }

    #[tokio::test]
    async fn test_concurrent_callers_share_session() {
        let runtime = MockRuntime::default();
        let manager = Arc::new(SessionManager::with_runtime(Arc::new(runtime.clone())));
        let cancel = CancelToken::new();

        let (a, b) = tokio::join!(
            manager.ensure_session(None, &cancel),
            manager.ensure_session(None, &cancel)
        );
        assert!(a.is_ok() && b.is_ok());
        assert_eq!(runtime.sessions_created(), 1);
    }

    #[tokio::test]
    async fn test_download_status_and_progress() {
        let runtime = MockRuntime::default().with_availability(Availability::Downloadable);
        let manager = SessionManager::with_runtime(Arc::new(runtime));
        let (tx, mut rx) = mpsc::unbounded_channel();

        manager.ensure_session(Some(&tx), &CancelToken::new()).await.unwrap();

        let events = drain(&mut rx);
        assert_eq!(events[0], GenerationEvent::Status(STATUS_DOWNLOADING.to_string()));
        assert_eq!(events[1], GenerationEvent::DownloadProgress(0));
        assert!(events.contains(&GenerationEvent::DownloadProgress(50)));
        assert_eq!(events.last(), Some(&GenerationEvent::DownloadProgress(100)));
    }

    #[tokio::test]
    async fn test_download_in_progress_status() {
        let runtime = MockRuntime::default().with_availability(Availability::Downloading);
        let manager = SessionManager::with_runtime(Arc::new(runtime));
        let (tx, mut rx) = mpsc::unbounded_channel();

        manager.ensure_session(Some(&tx), &CancelToken::new()).await.unwrap();
        assert_eq!(
            drain(&mut rx)[0],
            GenerationEvent::Status(STATUS_DOWNLOAD_IN_PROGRESS.to_string())
        );
    }

    #[tokio::test]
    async fn test_destroy_clears_session() {
        let runtime = MockRuntime::default();
        let manager = SessionManager::with_runtime(Arc::new(runtime.clone()));
        let cancel = CancelToken::new();

        manager.ensure_session(None, &cancel).await.unwrap();
        manager.destroy_session().await;
        assert!(!manager.has_session().await);
        assert_eq!(runtime.sessions_destroyed(), 1);

        manager.ensure_session(None, &cancel).await.unwrap();
        assert_eq!(runtime.sessions_created(), 2);

        manager.destroy_session().await;
        manager.destroy_session().await;
        assert_eq!(runtime.sessions_destroyed(), 2);
    }

    #[tokio::test]
    async fn test_cancelled_before_session() {
        let manager = SessionManager::with_runtime(Arc::new(MockRuntime::default()));
        let cancel = CancelToken::new();
        cancel.cancel();

        let result = manager.ensure_session(None, &cancel).await;
        assert_eq!(result.err(), Some(GeneratorError::Cancelled));
    }
}
