//! Playback-history bridge trait.
//!
//! Resume offsets are owned by the host's history store; the core only reads
//! the offset when a session starts and records the playback clock while the
//! session runs.

use crate::error::Result;
use std::path::Path;

/// Trait for per-file playback offset persistence.
#[async_trait::async_trait]
pub trait ResumeStore: Send + Sync {
    /// Stored resume offset in seconds for `path`, if any.
    async fn resume_for(&self, path: &Path) -> Option<f64>;

    /// Persist the current playback position for `path`.
    async fn record_position(&self, path: &Path, seconds: f64) -> Result<()>;
}
