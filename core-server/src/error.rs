//! # Stream Server Error Types

use thiserror::Error;

/// Errors surfaced by the loopback stream server.
#[derive(Error, Debug)]
pub enum ServerError {
    /// No loopback port could be bound.
    #[error("HTTP listener unavailable: {0}")]
    ListenerUnavailable(String),

    /// A registration was malformed (e.g. an HLS directory without the
    /// named playlist).
    #[error("Invalid stream registration: {0}")]
    InvalidRequest(String),

    /// Listener or filesystem I/O failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for stream server operations.
pub type Result<T> = std::result::Result<T, ServerError>;
