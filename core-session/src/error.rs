//! # Session Error Types
//!
//! The controller is the only component that surfaces failures to the user;
//! every collaborator error is converted into this taxonomy at the boundary.

use thiserror::Error;

/// Errors surfaced by the playback session controller.
#[derive(Error, Debug)]
pub enum SessionError {
    /// Pipeline assembly failed (missing tools, bad configuration).
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The processing coordinator could not produce a usable artifact.
    #[error("Processing failed: {0}")]
    Processing(#[from] core_processing::ProcessingError),

    /// The loopback stream server refused the registration.
    #[error("Stream server error: {0}")]
    Server(#[from] core_server::ServerError),

    /// The renderer reported a fatal error that could not be retried.
    #[error("Renderer failure: {0}")]
    Renderer(String),

    /// The source file could not be opened with the required access token.
    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    /// The history store could not be read or written.
    #[error("History store error: {0}")]
    History(String),
}

/// Result type for session operations.
pub type Result<T> = std::result::Result<T, SessionError>;
