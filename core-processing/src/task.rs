//! Cancellable job handle.
//!
//! A [`ProcessingTask`] is the controller's grip on a running job. Cancel is
//! idempotent, observable from any clone, and fires immediately for waiters
//! that attach after the fact - a job that was cancelled before its child
//! process even spawned must still tear down promptly.

use tokio_util::sync::CancellationToken;

/// Handle to a running processing job.
#[derive(Debug, Clone)]
pub struct ProcessingTask {
    token: CancellationToken,
}

impl ProcessingTask {
    pub(crate) fn new() -> Self {
        Self {
            token: CancellationToken::new(),
        }
    }

    /// Request cancellation. Idempotent; the job terminates its child
    /// process and reports [`ProcessingError::Cancelled`](crate::ProcessingError::Cancelled)
    /// or drops silently if the artifact was already handed off.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// Whether cancellation has been requested.
    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Token the job's worker selects on.
    pub(crate) fn token(&self) -> CancellationToken {
        self.token.clone()
    }
}
