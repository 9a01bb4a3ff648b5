//! Cancellation token for a generation run

use std::sync::Arc;
use tokio::sync::watch;

/// Cloneable cancellation signal shared by every step of one run
///
/// Once cancelled a token stays cancelled. Clones observe the same signal.
#[derive(Debug, Clone)]
pub struct CancelToken {
    sender: Arc<watch::Sender<bool>>,
    receiver: watch::Receiver<bool>,
}

impl CancelToken {
    /// Create a token that has not fired
    pub fn new() -> Self {
        let (sender, receiver) = watch::channel(false);
        Self {
            sender: Arc::new(sender),
            receiver,
        }
    }

    /// Request cancellation
    pub fn cancel(&self) {
        self.sender.send_replace(true);
    }

    /// Check if cancellation has been requested
    pub fn is_cancelled(&self) -> bool {
        *self.receiver.borrow()
    }

    /// Whether both tokens carry the same signal
    pub fn same_signal(&self, other: &CancelToken) -> bool {
        Arc::ptr_eq(&self.sender, &other.sender)
    }

    /// Resolve once cancellation has been requested
    pub async fn cancelled(&self) {
        let mut receiver = self.receiver.clone();
        // The sender lives as long as any token, so this only ends on `true`
        let _ = receiver.wait_for(|cancelled| *cancelled).await;
    }
}

impl Default for CancelToken {
    fn default() -> Self {
        Self::new()
    }
}
