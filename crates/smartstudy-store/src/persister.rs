//! Debounced background persistence

use smartstudy_domain::{PersistError, SessionPersistence, SessionStore, StudySession};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::time::sleep;

enum Command {
    Schedule(u64, StudySession),
    Flush(oneshot::Sender<()>),
}

/// Writes sessions to a store once updates stop arriving
///
/// Every [`schedule_persist`](SessionPersistence::schedule_persist) replaces
/// the pending snapshot and restarts the quiet period; only the newest
/// snapshot is written. [`persist_now`](SessionPersistence::persist_now)
/// writes synchronously and supersedes anything pending. A pending snapshot
/// is written when the persister is dropped.
///
/// Must be created inside a Tokio runtime.
pub struct DebouncedPersister<S> {
    store: Arc<Mutex<S>>,
    commands: mpsc::UnboundedSender<Command>,
    generation: Arc<AtomicU64>,
}

impl<S> DebouncedPersister<S>
where
    S: SessionStore + Send + 'static,
    S::Error: std::fmt::Display,
{
    /// Start a persister over `store` with the given quiet period
    pub fn new(store: S, delay: Duration) -> Self {
        let store = Arc::new(Mutex::new(store));
        let generation = Arc::new(AtomicU64::new(0));
        let (commands, receiver) = mpsc::unbounded_channel();

        tokio::spawn(run_worker(
            Arc::clone(&store),
            Arc::clone(&generation),
            receiver,
            delay,
        ));
        tracing::debug!("Persister started (delay: {:?})", delay);

        Self {
            store,
            commands,
            generation,
        }
    }

    /// Shared handle to the underlying store
    pub fn store(&self) -> Arc<Mutex<S>> {
        Arc::clone(&self.store)
    }

    /// Write the pending snapshot now, if any
    pub async fn flush(&self) {
        let (ack, done) = oneshot::channel();
        if self.commands.send(Command::Flush(ack)).is_ok() {
            let _ = done.await;
        }
    }
}

impl<S> SessionPersistence for DebouncedPersister<S>
where
    S: SessionStore + Send + 'static,
    S::Error: std::error::Error + Send + Sync + 'static,
{
    fn persist_now(&self, session: &StudySession) -> Result<(), PersistError> {
        let mut store = lock(&self.store);
        // Anything scheduled before this call is now stale
        self.generation.fetch_add(1, Ordering::SeqCst);
        store.save_session(session)?;
        Ok(())
    }

    fn schedule_persist(&self, session: &StudySession) {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        if self
            .commands
            .send(Command::Schedule(generation, session.clone()))
            .is_err()
        {
            tracing::warn!("Persister worker has stopped; dropping scheduled save");
        }
    }
}

async fn run_worker<S>(
    store: Arc<Mutex<S>>,
    generation: Arc<AtomicU64>,
    mut commands: mpsc::UnboundedReceiver<Command>,
    delay: Duration,
) where
    S: SessionStore,
    S::Error: std::fmt::Display,
{
    let mut pending: Option<(u64, StudySession)> = None;

    loop {
        let command = if pending.is_some() {
            tokio::select! {
                command = commands.recv() => command,
                _ = sleep(delay) => {
                    write_pending(&store, &generation, pending.take());
                    continue;
                }
            }
        } else {
            commands.recv().await
        };

        match command {
            Some(Command::Schedule(stamp, session)) => pending = Some((stamp, session)),
            Some(Command::Flush(ack)) => {
                write_pending(&store, &generation, pending.take());
                let _ = ack.send(());
            }
            None => {
                write_pending(&store, &generation, pending.take());
                tracing::debug!("Persister stopped");
                break;
            }
        }
    }
}

fn write_pending<S>(store: &Mutex<S>, generation: &AtomicU64, pending: Option<(u64, StudySession)>)
where
    S: SessionStore,
    S::Error: std::fmt::Display,
{
    let Some((stamp, session)) = pending else {
        return;
    };
    let mut store = lock(store);
    if generation.load(Ordering::SeqCst) != stamp {
        tracing::debug!("Skipping superseded session snapshot");
        return;
    }
    match store.save_session(&session) {
        Ok(id) => tracing::debug!("Persisted session {}", id),
        Err(e) => tracing::warn!("Failed to persist session: {}", e),
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
