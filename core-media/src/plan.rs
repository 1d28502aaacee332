//! Playback plan model.
//!
//! A [`PlaybackPlan`] is the planner's verdict on one source file: hand the
//! renderer the original URL, repackage the container without touching the
//! bitstreams, or re-encode. The request variants carry everything the
//! processing coordinator needs to build its argument vectors.

use std::path::PathBuf;

/// Target container for processed output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContainerFormat {
    Mp4,
}

impl ContainerFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContainerFormat::Mp4 => "mp4",
        }
    }
}

/// Video codec the transcoder encodes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VideoCodecTarget {
    H264,
    Hevc,
}

impl VideoCodecTarget {
    /// Widest frame the renderer accepts for this codec before the planner
    /// inserts a downscale filter.
    pub fn max_width(&self) -> u32 {
        match self {
            VideoCodecTarget::H264 => 1920,
            VideoCodecTarget::Hevc => 3840,
        }
    }
}

/// Audio codec the transcoder encodes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioCodecTarget {
    Aac,
    Ac3,
}

/// How the transcoder materializes its output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    /// A single progressive MP4 file, complete before playback starts.
    Progressive,
    /// An event-style HLS playlist whose segments appear incrementally.
    Hls,
}

/// Container repackaging without re-encoding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemuxRequest {
    /// Source file to repackage.
    pub source: PathBuf,
    /// Target container.
    pub target: ContainerFormat,
    /// Absolute index of the chosen video stream, when the probe supplied
    /// one; `None` selects the default video mapping.
    pub video_stream: Option<usize>,
    /// Absolute index of the chosen audio stream, when the probe supplied
    /// one; `None` selects the default (optional) audio mapping.
    pub audio_stream: Option<usize>,
    /// Codec name of the original video stream, when known. Drives the
    /// compatibility tag for HEVC bitstreams.
    pub video_codec: Option<String>,
}

impl RemuxRequest {
    /// Whether the carried video bitstream is HEVC and needs the `hvc1`
    /// compatibility tag in the output container.
    pub fn is_hevc(&self) -> bool {
        matches!(self.video_codec.as_deref(), Some("hevc") | Some("hev1"))
    }
}

/// Re-encode with codec and bitrate parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranscodeRequest {
    /// Source file to re-encode.
    pub source: PathBuf,
    /// Video codec target.
    pub video_codec: VideoCodecTarget,
    /// Audio codec target.
    pub audio_codec: AudioCodecTarget,
    /// Target container.
    pub container: ContainerFormat,
    /// Video bitrate in the processor's notation (e.g. `"10000k"`).
    pub video_bitrate: String,
    /// Rate-control buffer size in the processor's notation.
    pub buffer_size: String,
    /// Audio bitrate in the processor's notation.
    pub audio_bitrate: String,
    /// Optional downscale filter (e.g. `"scale=3840:-2"`).
    pub scale_filter: Option<String>,
    /// Whether to request the platform's hardware encoder.
    pub hardware_accelerated: bool,
    /// Output materialization mode.
    pub output: OutputMode,
}

/// The planner's verdict for one source file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlaybackPlan {
    /// The renderer can consume the original file.
    Direct(PathBuf),
    /// Container repackaging; no codec change.
    Remux(RemuxRequest),
    /// Re-encode with the carried parameters.
    Transcode(TranscodeRequest),
}

impl PlaybackPlan {
    /// The source file this plan plays.
    pub fn source(&self) -> &PathBuf {
        match self {
            PlaybackPlan::Direct(source) => source,
            PlaybackPlan::Remux(request) => &request.source,
            PlaybackPlan::Transcode(request) => &request.source,
        }
    }

    /// Short label for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            PlaybackPlan::Direct(_) => "direct",
            PlaybackPlan::Remux(_) => "remux",
            PlaybackPlan::Transcode(_) => "transcode",
        }
    }

    /// Whether this plan needs the processing coordinator at all.
    pub fn needs_processing(&self) -> bool {
        !matches!(self, PlaybackPlan::Direct(_))
    }
}
