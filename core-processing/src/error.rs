//! # Processing Error Types

use thiserror::Error;

/// Errors that can occur while driving the external media processor.
#[derive(Error, Debug)]
pub enum ProcessingError {
    /// The processor exited non-zero or produced no output file.
    #[error("Processor failed (exit {exit_code:?}): {stderr_tail}")]
    Failed {
        /// Exit code, when the process terminated normally.
        exit_code: Option<i32>,
        /// Tail of the captured stderr, or `"unknown error"`.
        stderr_tail: String,
    },

    /// Output never became ready: the HLS playlist missed its readiness
    /// deadline, or a success-looking exit left no output behind.
    #[error("Processor produced no usable output")]
    OutputMissing,

    /// The job was cancelled through its task handle.
    #[error("Processing cancelled")]
    Cancelled,

    /// The processor binary could not be launched.
    #[error("Failed to launch processor: {0}")]
    Spawn(String),

    /// Scratch-directory or output I/O failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ProcessingError {
    /// Returns `true` for failures the controller surfaces to the user
    /// (cancellations are silently dropped upstream).
    pub fn is_user_visible(&self) -> bool {
        !matches!(self, ProcessingError::Cancelled)
    }
}

/// Result type for processing operations.
pub type Result<T> = std::result::Result<T, ProcessingError>;
