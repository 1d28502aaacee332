//! Stream sessions and their handles.
//!
//! A session binds one registered artifact to a UUID route on the shared
//! listener. The handle returned by registration is the only way to end a
//! session; cleanup removes the route binding but deliberately leaves the
//! artifact's files alone - the artifact owns its scratch directory and the
//! controller decides when the renderer has truly released the stream.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

/// What a session serves.
#[derive(Debug, Clone)]
pub enum SessionKind {
    /// A single file served with byte-range support.
    File(PathBuf),
    /// A playlist directory served read-only.
    Hls {
        /// Directory holding the playlist and its segments.
        directory: PathBuf,
        /// Playlist file name within `directory`.
        playlist: String,
    },
}

/// Shared server state: the bound port (once the listener exists) and the
/// session table. One lock guards both, including listener startup.
#[derive(Debug, Default)]
pub(crate) struct ServerState {
    pub(crate) port: Option<u16>,
    pub(crate) sessions: HashMap<Uuid, SessionKind>,
}

pub(crate) type SharedState = Arc<Mutex<ServerState>>;

/// Disposable reference to a registered stream.
///
/// Cleanup removes the session from the table and is idempotent; it also
/// runs on drop so an abandoned handle cannot leave a stale route behind.
/// Requests against a cleaned-up session answer `404`.
pub struct StreamHandle {
    id: Uuid,
    url: String,
    state: SharedState,
    cleaned: AtomicBool,
}

impl StreamHandle {
    pub(crate) fn new(id: Uuid, url: String, state: SharedState) -> Self {
        Self {
            id,
            url,
            state,
            cleaned: AtomicBool::new(false),
        }
    }

    /// Loopback URL the renderer opens.
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Session identifier within the server.
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Remove the session binding. Idempotent; does not touch the artifact's
    /// files.
    pub fn cleanup(&self) {
        if self.cleaned.swap(true, Ordering::SeqCst) {
            return;
        }
        self.state.lock().sessions.remove(&self.id);
        debug!(session = %self.id, "Removed stream session");
    }
}

impl Drop for StreamHandle {
    fn drop(&mut self) {
        self.cleanup();
    }
}

impl std::fmt::Debug for StreamHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamHandle")
            .field("id", &self.id)
            .field("url", &self.url)
            .field("cleaned", &self.cleaned.load(Ordering::SeqCst))
            .finish()
    }
}
