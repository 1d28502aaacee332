//! Probed media model.
//!
//! A [`MediaProfile`] is the inspector's normalized view of one local file:
//! the container's format-name list exactly as the probe reports it
//! (comma-separated, e.g. `"mov,mp4,m4a"`), at most one primary video
//! stream, and the audio streams in probe order.

use std::path::PathBuf;

/// Broad codec classification of a probed stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaStreamKind {
    Video,
    Audio,
    Other,
}

/// One stream reported by the probe.
///
/// Fields the probe omits - or encodes in a shape that fails to parse - are
/// `None`; inspection never fails over a single malformed stream field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaStreamInfo {
    /// Stream classification.
    pub kind: MediaStreamKind,
    /// Codec name, lowercase (e.g. `"h264"`, `"aac"`).
    pub codec_name: String,
    /// Codec profile string when reported (e.g. `"High 10"`).
    pub profile: Option<String>,
    /// Frame width (video streams).
    pub width: Option<u32>,
    /// Frame height (video streams).
    pub height: Option<u32>,
    /// Channel count (audio streams).
    pub channels: Option<u32>,
    /// Sample rate in hertz (audio streams).
    pub sample_rate: Option<u32>,
    /// Average bitrate in bits per second, when reported.
    pub bit_rate: Option<u64>,
    /// Absolute stream index within the input.
    pub index: usize,
}

/// Normalized probe result for one source file.
///
/// Invariants: at most one video stream is primary; `audio` preserves the
/// probe's stream order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaProfile {
    /// The probed file.
    pub source: PathBuf,
    /// Comma-separated container format names as reported by the probe.
    pub format_name: String,
    /// Primary video stream, when the file has one.
    pub video: Option<MediaStreamInfo>,
    /// Audio streams in probe order.
    pub audio: Vec<MediaStreamInfo>,
}

impl MediaProfile {
    /// Individual container tokens from the comma-separated format name.
    pub fn format_tokens(&self) -> impl Iterator<Item = &str> {
        self.format_name
            .split(',')
            .map(str::trim)
            .filter(|token| !token.is_empty())
    }

    /// Codec name of the primary video stream, if any.
    pub fn primary_video_codec(&self) -> Option<&str> {
        self.video.as_ref().map(|v| v.codec_name.as_str())
    }

    /// First audio stream whose codec satisfies `accept`.
    pub fn first_audio_where(
        &self,
        accept: impl Fn(&str) -> bool,
    ) -> Option<&MediaStreamInfo> {
        self.audio.iter().find(|a| accept(&a.codec_name))
    }

    /// Primary video dimensions, when known.
    pub fn video_dimensions(&self) -> Option<(u32, u32)> {
        let video = self.video.as_ref()?;
        Some((video.width?, video.height?))
    }
}
