//! # Media Inspection Error Types

use thiserror::Error;

/// Errors that can occur while probing a media file.
///
/// Every variant collapses to the same planner behavior - the heuristic,
/// extension-based fallback plan - but the distinction is kept for logging.
#[derive(Error, Debug)]
pub enum InspectError {
    /// The probe binary could not be found on this system.
    #[error("Probe binary not found: {0}")]
    ToolMissing(String),

    /// The probe process could not be spawned or exited non-zero.
    #[error("Probe failed for {path}: {reason}")]
    ProbeFailed { path: String, reason: String },

    /// The probe ran but produced output that could not be decoded.
    #[error("Probe output could not be parsed: {0}")]
    InvalidOutput(String),
}

/// Result type for media inspection operations.
pub type Result<T> = std::result::Result<T, InspectError>;
