//! Resume-history persistence.
//!
//! The player keeps one JSON document with the sidebar entries, the last
//! played file, and a per-file map of playback offsets. The core only needs
//! the offset interface, but the store round-trips the full document so the
//! GUI-owned fields survive every write. Updates are atomic: the new
//! document is written next to the target and renamed over it.

use bridge_traits::error::{BridgeError, Result as BridgeResult};
use bridge_traits::history::ResumeStore;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;
use tracing::{debug, warn};

/// One sidebar entry. Owned by the GUI; preserved verbatim here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    /// Opaque security-scoped bookmark blob.
    pub bookmark: String,
    /// Display title.
    pub title: String,
    /// Absolute file path.
    pub path: String,
}

/// The on-disk history document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryDocument {
    #[serde(default)]
    pub entries: Vec<HistoryEntry>,
    #[serde(default)]
    pub last_played_path: Option<String>,
    #[serde(default)]
    pub last_playback_seconds: Option<f64>,
    #[serde(default)]
    pub playback_offsets: HashMap<String, f64>,
}

impl HistoryDocument {
    /// Resume offset for `path`: the per-file map first, falling back to the
    /// last playback clock only when `path` was the last played file.
    pub fn resume_for(&self, path: &str) -> Option<f64> {
        if let Some(offset) = self.playback_offsets.get(path) {
            return Some(*offset);
        }
        if self.last_played_path.as_deref() == Some(path) {
            return self.last_playback_seconds;
        }
        None
    }

    /// Record the playback clock for `path`.
    pub fn record_position(&mut self, path: &str, seconds: f64) {
        self.playback_offsets.insert(path.to_string(), seconds);
        self.last_played_path = Some(path.to_string());
        self.last_playback_seconds = Some(seconds);
    }
}

/// JSON-file implementation of the [`ResumeStore`] contract.
pub struct JsonHistoryStore {
    path: PathBuf,
    // Serializes read-modify-write cycles between concurrent recorders.
    write_lock: Mutex<()>,
}

impl JsonHistoryStore {
    /// Create a store over the document at `path`. A missing document reads
    /// as empty; it is created on the first write.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    /// Load the current document. Unreadable or corrupt documents read as
    /// empty rather than wedging playback.
    pub async fn load(&self) -> HistoryDocument {
        match tokio::fs::read(&self.path).await {
            Ok(bytes) => match serde_json::from_slice(&bytes) {
                Ok(document) => document,
                Err(e) => {
                    warn!(path = %self.path.display(), error = %e, "History document corrupt; starting empty");
                    HistoryDocument::default()
                }
            },
            Err(_) => HistoryDocument::default(),
        }
    }

    /// Write `document` atomically (write-then-rename).
    pub async fn save(&self, document: &HistoryDocument) -> BridgeResult<()> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let json = serde_json::to_vec_pretty(document)
            .map_err(|e| BridgeError::OperationFailed(format!("serialize history: {}", e)))?;

        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, &json).await?;
        tokio::fs::rename(&tmp, &self.path).await?;

        debug!(path = %self.path.display(), "Persisted history document");
        Ok(())
    }
}

#[async_trait::async_trait]
impl ResumeStore for JsonHistoryStore {
    async fn resume_for(&self, path: &Path) -> Option<f64> {
        self.load().await.resume_for(&path.to_string_lossy())
    }

    async fn record_position(&self, path: &Path, seconds: f64) -> BridgeResult<()> {
        let _guard = self.write_lock.lock().await;
        let mut document = self.load().await;
        document.record_position(&path.to_string_lossy(), seconds);
        self.save(&document).await
    }
}
