//! Materialized processing outputs.
//!
//! An artifact is what the coordinator hands back once a job's output is
//! ready: either a single completed file or an HLS directory whose playlist
//! has recorded its first segment. The artifact owns the job's scratch
//! directory; cleanup removes it recursively, is idempotent, and also runs
//! on drop so the directory cannot leak on early exit paths.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, warn};

/// What the processor materialized.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArtifactKind {
    /// A single completed output file.
    File(PathBuf),
    /// A directory containing a playlist and one or more segment files.
    Hls {
        /// Directory holding the playlist and its segments.
        directory: PathBuf,
        /// Playlist file name within `directory`.
        playlist: String,
    },
}

/// A ready processing output plus ownership of its scratch directory.
#[derive(Debug)]
pub struct ProcessingArtifact {
    kind: ArtifactKind,
    scratch: PathBuf,
    cleaned: AtomicBool,
}

impl ProcessingArtifact {
    /// Artifact for a completed single-file output.
    pub fn file(scratch: PathBuf, output: PathBuf) -> Self {
        Self {
            kind: ArtifactKind::File(output),
            scratch,
            cleaned: AtomicBool::new(false),
        }
    }

    /// Artifact for an HLS directory whose playlist is ready.
    pub fn hls(scratch: PathBuf, directory: PathBuf, playlist: impl Into<String>) -> Self {
        Self {
            kind: ArtifactKind::Hls {
                directory,
                playlist: playlist.into(),
            },
            scratch,
            cleaned: AtomicBool::new(false),
        }
    }

    /// The materialized output.
    pub fn kind(&self) -> &ArtifactKind {
        &self.kind
    }

    /// The scratch directory this artifact owns.
    pub fn scratch_dir(&self) -> &Path {
        &self.scratch
    }

    /// Remove the scratch directory. Idempotent; also invoked on drop.
    pub fn cleanup(&self) {
        if self.cleaned.swap(true, Ordering::SeqCst) {
            return;
        }
        match std::fs::remove_dir_all(&self.scratch) {
            Ok(()) => debug!(dir = %self.scratch.display(), "Removed processing scratch directory"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!(
                dir = %self.scratch.display(),
                error = %e,
                "Failed to remove processing scratch directory"
            ),
        }
    }
}

impl Drop for ProcessingArtifact {
    fn drop(&mut self) {
        self.cleanup();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cleanup_removes_scratch_once() {
        let scratch = tempfile::tempdir().unwrap().keep();
        let output = scratch.join("output.mp4");
        std::fs::write(&output, b"mp4").unwrap();

        let artifact = ProcessingArtifact::file(scratch.clone(), output);
        assert!(scratch.exists());

        artifact.cleanup();
        assert!(!scratch.exists());

        // Second call is a no-op.
        artifact.cleanup();
    }

    #[test]
    fn test_drop_cleans_up() {
        let scratch = tempfile::tempdir().unwrap().keep();
        std::fs::write(scratch.join("master.m3u8"), b"#EXTM3U").unwrap();

        {
            let _artifact =
                ProcessingArtifact::hls(scratch.clone(), scratch.clone(), "master.m3u8");
        }
        assert!(!scratch.exists());
    }

    #[test]
    fn test_kind_accessor() {
        let scratch = tempfile::tempdir().unwrap();
        let artifact = ProcessingArtifact::hls(
            scratch.path().to_path_buf(),
            scratch.path().to_path_buf(),
            "master.m3u8",
        );
        match artifact.kind() {
            ArtifactKind::Hls { playlist, .. } => assert_eq!(playlist, "master.m3u8"),
            other => panic!("expected hls artifact, got {:?}", other),
        }
    }
}
