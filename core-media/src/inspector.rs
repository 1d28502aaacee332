//! Media inspector.
//!
//! Invokes the external probe binary as a child process with quiet logging,
//! JSON output, and both per-stream and format sections, then normalizes the
//! document into a [`MediaProfile`]. The inspector keeps no state between
//! calls.

use crate::error::{InspectError, Result};
use crate::profile::{MediaProfile, MediaStreamInfo, MediaStreamKind};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tokio::process::Command;
use tracing::debug;

/// Probes media files for container, codec, and stream metadata.
pub struct MediaInspector {
    ffprobe: PathBuf,
}

impl MediaInspector {
    /// Create an inspector that runs the probe binary at `ffprobe`.
    pub fn new(ffprobe: impl Into<PathBuf>) -> Self {
        Self {
            ffprobe: ffprobe.into(),
        }
    }

    /// Probe `source` and build its [`MediaProfile`].
    ///
    /// # Errors
    ///
    /// Any failure to run the probe, a non-zero exit, or undecodable output
    /// yields an [`InspectError`]; individual stream fields that fail to
    /// parse are tolerated and become `None`.
    pub async fn profile(&self, source: &Path) -> Result<MediaProfile> {
        let output = Command::new(&self.ffprobe)
            .args(["-v", "quiet", "-print_format", "json", "-show_streams", "-show_format"])
            .arg(source)
            .output()
            .await
            .map_err(|e| InspectError::ToolMissing(format!("{}: {}", self.ffprobe.display(), e)))?;

        if !output.status.success() {
            return Err(InspectError::ProbeFailed {
                path: source.display().to_string(),
                reason: format!("exit status {}", output.status),
            });
        }

        let document: ProbeDocument = serde_json::from_slice(&output.stdout)
            .map_err(|e| InspectError::InvalidOutput(e.to_string()))?;

        let profile = build_profile(source, document);
        let source_display = source.to_string_lossy();
        debug!(
            file = %core_runtime::logging::strip_path(&source_display),
            format = %profile.format_name,
            video = ?profile.primary_video_codec(),
            audio_streams = profile.audio.len(),
            "Probed media file"
        );
        Ok(profile)
    }
}

fn build_profile(source: &Path, document: ProbeDocument) -> MediaProfile {
    let format_name = document
        .format
        .and_then(|f| f.format_name)
        .unwrap_or_default();

    let mut video = None;
    let mut audio = Vec::new();

    for stream in document.streams {
        let info = stream.into_info();
        match info.kind {
            // The first video stream is the primary one; later video streams
            // (cover art, secondary angles) are ignored.
            MediaStreamKind::Video if video.is_none() => video = Some(info),
            MediaStreamKind::Audio => audio.push(info),
            _ => {}
        }
    }

    MediaProfile {
        source: source.to_path_buf(),
        format_name,
        video,
        audio,
    }
}

// ============================================================================
// Probe JSON model
// ============================================================================

#[derive(Debug, Deserialize)]
struct ProbeDocument {
    #[serde(default)]
    streams: Vec<ProbeStream>,
    format: Option<ProbeFormat>,
}

#[derive(Debug, Deserialize)]
struct ProbeFormat {
    format_name: Option<String>,
}

/// Raw stream entry. Numeric fields the probe reports as strings are kept as
/// strings here and parsed leniently in `into_info`.
#[derive(Debug, Deserialize)]
struct ProbeStream {
    index: Option<u64>,
    codec_type: Option<String>,
    codec_name: Option<String>,
    profile: Option<String>,
    width: Option<u64>,
    height: Option<u64>,
    channels: Option<u64>,
    sample_rate: Option<String>,
    bit_rate: Option<String>,
}

impl ProbeStream {
    fn into_info(self) -> MediaStreamInfo {
        let kind = match self.codec_type.as_deref() {
            Some("video") => MediaStreamKind::Video,
            Some("audio") => MediaStreamKind::Audio,
            _ => MediaStreamKind::Other,
        };

        MediaStreamInfo {
            kind,
            codec_name: self.codec_name.unwrap_or_default().to_lowercase(),
            profile: self.profile,
            width: self.width.and_then(|w| u32::try_from(w).ok()),
            height: self.height.and_then(|h| u32::try_from(h).ok()),
            channels: self.channels.and_then(|c| u32::try_from(c).ok()),
            sample_rate: self.sample_rate.and_then(|s| s.parse().ok()),
            bit_rate: self.bit_rate.and_then(|b| b.parse().ok()),
            index: self.index.map(|i| i as usize).unwrap_or(0),
        }
    }
}
