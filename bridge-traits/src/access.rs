//! Scoped access to user-selected media files.
//!
//! Sandboxed hosts gate file access behind security-scoped tokens that must
//! be held for the duration of playback and released exactly once. The core
//! acquires a token when a session starts and releases it during teardown;
//! [`SourceToken`] guarantees the release also happens on early exit paths.

use crate::error::{BridgeError, Result};
use std::fs::File;
use std::path::Path;

/// Opaque guard for an acquired file-access grant.
///
/// Dropping the token releases the grant. `release` may be called explicitly;
/// calling it more than once is a no-op.
pub struct SourceToken {
    release: Option<Box<dyn FnOnce() + Send>>,
}

impl SourceToken {
    /// Construct a token that runs `release` when released or dropped.
    pub fn new(release: impl FnOnce() + Send + 'static) -> Self {
        Self {
            release: Some(Box::new(release)),
        }
    }

    /// Construct a token with no release action (unsandboxed hosts).
    pub fn noop() -> Self {
        Self { release: None }
    }

    /// Release the grant now. Idempotent.
    pub fn release(&mut self) {
        if let Some(release) = self.release.take() {
            release();
        }
    }
}

impl Drop for SourceToken {
    fn drop(&mut self) {
        self.release();
    }
}

impl std::fmt::Debug for SourceToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SourceToken")
            .field("released", &self.release.is_none())
            .finish()
    }
}

/// Trait for host-provided scoped file access.
pub trait SourceAccess: Send + Sync {
    /// Acquire access to `path` for the lifetime of the returned token.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::PermissionDenied`] when the host cannot grant
    /// access to the file.
    fn acquire(&self, path: &Path) -> Result<SourceToken>;
}

/// Plain-filesystem implementation for hosts without a sandbox.
///
/// Verifies the file can be opened for reading and returns a token with no
/// release action.
#[derive(Debug, Default, Clone, Copy)]
pub struct FilesystemAccess;

impl SourceAccess for FilesystemAccess {
    fn acquire(&self, path: &Path) -> Result<SourceToken> {
        File::open(path)
            .map_err(|e| BridgeError::PermissionDenied(format!("{}: {}", path.display(), e)))?;
        Ok(SourceToken::noop())
    }
}
