//! Playback planner.
//!
//! Maps a probed [`MediaProfile`] to the cheapest transformation the
//! renderer can live with: direct play when container and codecs are all
//! natively supported, a container remux when only the container is the
//! problem, and a transcode otherwise. When probing fails entirely the
//! planner falls back to a heuristic keyed off the file extension.
//!
//! The decision procedure and its classification tables are the single
//! source of truth for direct playability; the extension registry is only
//! consulted on the probe-failure path.

use crate::error::InspectError;
use crate::format::VideoFormatSupport;
use crate::inspector::MediaInspector;
use crate::plan::{
    AudioCodecTarget, ContainerFormat, OutputMode, PlaybackPlan, RemuxRequest, TranscodeRequest,
    VideoCodecTarget,
};
use crate::profile::MediaProfile;
use std::path::Path;
use tracing::{debug, warn};

/// Video codecs the renderer decodes natively.
pub const DIRECT_VIDEO_CODECS: &[&str] = &["h264", "avc1", "hev1", "hevc"];

/// Audio codecs the renderer decodes natively.
pub const DIRECT_AUDIO_CODECS: &[&str] = &["aac", "mp3", "ac3", "eac3"];

/// Container tokens (within the probe's comma-separated format name) the
/// renderer demuxes natively.
pub const DIRECT_CONTAINER_TOKENS: &[&str] =
    &["mov", "mp4", "m4a", "m4v", "ismv", "isom", "dash", "quicktime"];

/// Audio bitrate used for every transcode.
const TRANSCODE_AUDIO_BITRATE: &str = "192k";

/// Maps media profiles to playback plans.
///
/// Pure with respect to a fixed configuration and the inspector result; the
/// planner performs no I/O of its own beyond invoking the inspector.
pub struct PlaybackPlanner {
    inspector: MediaInspector,
}

impl PlaybackPlanner {
    /// Create a planner over the given inspector.
    pub fn new(inspector: MediaInspector) -> Self {
        Self { inspector }
    }

    /// Compute the plan for `source`.
    ///
    /// Probing failures never escape; they select the extension-based
    /// heuristic fallback instead.
    pub async fn plan(&self, source: &Path) -> PlaybackPlan {
        match self.inspector.profile(source).await {
            Ok(profile) => {
                let plan = Self::plan_for_profile(&profile);
                debug!(plan = plan.kind(), "Planned playback");
                plan
            }
            Err(error) => Self::fallback_plan(source, &error),
        }
    }

    /// Compute a plan that always transcodes, used after the renderer
    /// rejected a direct or remuxed stream.
    pub async fn forced_transcode_plan(&self, source: &Path) -> PlaybackPlan {
        match self.inspector.profile(source).await {
            Ok(profile) => PlaybackPlan::Transcode(Self::transcode_request(&profile)),
            Err(error) => {
                warn!(error = %error, "Probe failed for forced transcode; using fixed parameters");
                PlaybackPlan::Transcode(Self::fixed_transcode_request(source))
            }
        }
    }

    /// Pure decision procedure over a successful probe.
    pub fn plan_for_profile(profile: &MediaProfile) -> PlaybackPlan {
        let video_ok = profile
            .primary_video_codec()
            .map(|codec| DIRECT_VIDEO_CODECS.contains(&codec))
            .unwrap_or(false);
        let direct_audio = profile.first_audio_where(|codec| DIRECT_AUDIO_CODECS.contains(&codec));
        let container_ok = profile
            .format_tokens()
            .any(|token| DIRECT_CONTAINER_TOKENS.contains(&token));

        if video_ok && direct_audio.is_some() && container_ok {
            return PlaybackPlan::Direct(profile.source.clone());
        }

        if video_ok && !container_ok {
            if let Some(audio) = direct_audio {
                return PlaybackPlan::Remux(RemuxRequest {
                    source: profile.source.clone(),
                    target: ContainerFormat::Mp4,
                    video_stream: profile.video.as_ref().map(|v| v.index),
                    audio_stream: Some(audio.index),
                    video_codec: profile.primary_video_codec().map(str::to_string),
                });
            }
        }

        PlaybackPlan::Transcode(Self::transcode_request(profile))
    }

    /// Transcode parameters derived from probed dimensions.
    fn transcode_request(profile: &MediaProfile) -> TranscodeRequest {
        let (width, height) = profile.video_dimensions().unwrap_or((1920, 1080));
        let largest = width.max(height);

        let video_codec = if largest >= 1920 || height >= 1080 {
            VideoCodecTarget::Hevc
        } else {
            VideoCodecTarget::H264
        };

        // Bitrate ladder in kbps, keyed by the larger frame dimension.
        let kbps = match (largest, video_codec) {
            (d, VideoCodecTarget::Hevc) if d >= 3800 => 25_000,
            (d, VideoCodecTarget::H264) if d >= 3800 => 18_000,
            (d, VideoCodecTarget::Hevc) if d >= 2500 => 18_000,
            (d, VideoCodecTarget::H264) if d >= 2500 => 12_000,
            (d, VideoCodecTarget::Hevc) if d >= 1920 => 12_000,
            (d, VideoCodecTarget::H264) if d >= 1920 => 10_000,
            (_, VideoCodecTarget::Hevc) => 8_000,
            (_, VideoCodecTarget::H264) => 6_000,
        };

        let max_width = video_codec.max_width();
        let scale_filter = (width > max_width).then(|| format!("scale={}:-2", max_width));

        TranscodeRequest {
            source: profile.source.clone(),
            video_codec,
            audio_codec: AudioCodecTarget::Aac,
            container: ContainerFormat::Mp4,
            video_bitrate: format!("{}k", kbps),
            buffer_size: format!("{}k", kbps * 2),
            audio_bitrate: TRANSCODE_AUDIO_BITRATE.to_string(),
            scale_filter,
            hardware_accelerated: true,
            // HLS lets playback start while later segments are still being
            // written; progressive output would wait for the whole encode.
            output: OutputMode::Hls,
        }
    }

    /// Fixed transcode parameters for files the probe could not read.
    fn fixed_transcode_request(source: &Path) -> TranscodeRequest {
        TranscodeRequest {
            source: source.to_path_buf(),
            video_codec: VideoCodecTarget::H264,
            audio_codec: AudioCodecTarget::Aac,
            container: ContainerFormat::Mp4,
            video_bitrate: "10000k".to_string(),
            buffer_size: "20000k".to_string(),
            audio_bitrate: TRANSCODE_AUDIO_BITRATE.to_string(),
            scale_filter: None,
            hardware_accelerated: true,
            output: OutputMode::Hls,
        }
    }

    /// Extension-based heuristic used when probing fails.
    fn fallback_plan(source: &Path, error: &InspectError) -> PlaybackPlan {
        warn!(error = %error, "Probe unavailable; planning from extension");

        if VideoFormatSupport::prefers_direct(source) {
            PlaybackPlan::Direct(source.to_path_buf())
        } else if VideoFormatSupport::is_recognized(source) {
            PlaybackPlan::Remux(RemuxRequest {
                source: source.to_path_buf(),
                target: ContainerFormat::Mp4,
                video_stream: None,
                audio_stream: None,
                video_codec: None,
            })
        } else {
            PlaybackPlan::Transcode(Self::fixed_transcode_request(source))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profile::{MediaStreamInfo, MediaStreamKind};
    use std::path::PathBuf;

    fn video_stream(codec: &str, width: u32, height: u32, index: usize) -> MediaStreamInfo {
        MediaStreamInfo {
            kind: MediaStreamKind::Video,
            codec_name: codec.to_string(),
            profile: None,
            width: Some(width),
            height: Some(height),
            channels: None,
            sample_rate: None,
            bit_rate: None,
            index,
        }
    }

    fn audio_stream(codec: &str, index: usize) -> MediaStreamInfo {
        MediaStreamInfo {
            kind: MediaStreamKind::Audio,
            codec_name: codec.to_string(),
            profile: None,
            width: None,
            height: None,
            channels: Some(2),
            sample_rate: Some(48_000),
            bit_rate: None,
            index,
        }
    }

    fn profile(
        format_name: &str,
        video: Option<MediaStreamInfo>,
        audio: Vec<MediaStreamInfo>,
    ) -> MediaProfile {
        MediaProfile {
            source: PathBuf::from("/m/input"),
            format_name: format_name.to_string(),
            video,
            audio,
        }
    }

    #[test]
    fn test_direct_mp4_h264_aac() {
        let plan = PlaybackPlanner::plan_for_profile(&profile(
            "mov,mp4,m4a",
            Some(video_stream("h264", 1920, 1080, 0)),
            vec![audio_stream("aac", 1)],
        ));
        assert_eq!(plan, PlaybackPlan::Direct(PathBuf::from("/m/input")));
    }

    #[test]
    fn test_direct_requires_all_three() {
        // Direct container and codec, but no direct audio.
        let plan = PlaybackPlanner::plan_for_profile(&profile(
            "mov,mp4,m4a",
            Some(video_stream("h264", 1920, 1080, 0)),
            vec![audio_stream("flac", 1)],
        ));
        assert!(matches!(plan, PlaybackPlan::Transcode(_)));
    }

    #[test]
    fn test_mkv_with_direct_codecs_remuxes() {
        let plan = PlaybackPlanner::plan_for_profile(&profile(
            "matroska,webm",
            Some(video_stream("h264", 1920, 1080, 0)),
            vec![audio_stream("aac", 1)],
        ));

        match plan {
            PlaybackPlan::Remux(request) => {
                assert_eq!(request.target, ContainerFormat::Mp4);
                assert_eq!(request.video_stream, Some(0));
                assert_eq!(request.audio_stream, Some(1));
                assert_eq!(request.video_codec.as_deref(), Some("h264"));
            }
            other => panic!("expected remux, got {:?}", other),
        }
    }

    #[test]
    fn test_remux_picks_first_direct_audio() {
        let plan = PlaybackPlanner::plan_for_profile(&profile(
            "matroska,webm",
            Some(video_stream("hevc", 3840, 2160, 0)),
            vec![audio_stream("dts", 1), audio_stream("ac3", 2)],
        ));

        match plan {
            PlaybackPlan::Remux(request) => {
                assert_eq!(request.audio_stream, Some(2));
                assert!(request.is_hevc());
            }
            other => panic!("expected remux, got {:?}", other),
        }
    }

    #[test]
    fn test_avi_mpeg2_transcodes_uhd_to_hevc() {
        let plan = PlaybackPlanner::plan_for_profile(&profile(
            "avi",
            Some(video_stream("mpeg2video", 3840, 2160, 0)),
            vec![audio_stream("ac3", 1)],
        ));

        match plan {
            PlaybackPlan::Transcode(request) => {
                assert_eq!(request.video_codec, VideoCodecTarget::Hevc);
                assert_eq!(request.video_bitrate, "25000k");
                assert_eq!(request.buffer_size, "50000k");
                assert_eq!(request.audio_codec, AudioCodecTarget::Aac);
                assert_eq!(request.audio_bitrate, "192k");
                assert_eq!(request.scale_filter, None);
                assert_eq!(request.output, OutputMode::Hls);
                assert!(request.hardware_accelerated);
            }
            other => panic!("expected transcode, got {:?}", other),
        }
    }

    #[test]
    fn test_transcode_bitrate_ladder() {
        let cases = [
            // (width, height, expected codec, expected bitrate/buffer)
            (4096u32, 2160u32, VideoCodecTarget::Hevc, "25000k", "50000k"),
            (2560, 1440, VideoCodecTarget::Hevc, "18000k", "36000k"),
            (1920, 1080, VideoCodecTarget::Hevc, "12000k", "24000k"),
            (1280, 720, VideoCodecTarget::H264, "6000k", "12000k"),
        ];

        for (width, height, codec, bitrate, buffer) in cases {
            let plan = PlaybackPlanner::plan_for_profile(&profile(
                "avi",
                Some(video_stream("mpeg4", width, height, 0)),
                vec![audio_stream("pcm_s16le", 1)],
            ));
            match plan {
                PlaybackPlan::Transcode(request) => {
                    assert_eq!(request.video_codec, codec, "{}x{}", width, height);
                    assert_eq!(request.video_bitrate, bitrate, "{}x{}", width, height);
                    assert_eq!(request.buffer_size, buffer, "{}x{}", width, height);
                }
                other => panic!("expected transcode, got {:?}", other),
            }
        }
    }

    #[test]
    fn test_transcode_scale_filter_for_oversized_frames() {
        // Wider than HEVC's 3840 ceiling.
        let plan = PlaybackPlanner::plan_for_profile(&profile(
            "avi",
            Some(video_stream("mpeg2video", 5120, 2700, 0)),
            vec![audio_stream("mp2", 1)],
        ));
        match plan {
            PlaybackPlan::Transcode(request) => {
                assert_eq!(request.scale_filter.as_deref(), Some("scale=3840:-2"));
            }
            other => panic!("expected transcode, got {:?}", other),
        }
    }

    #[test]
    fn test_transcode_defaults_missing_dimensions() {
        let plan = PlaybackPlanner::plan_for_profile(&profile(
            "avi",
            Some(MediaStreamInfo {
                width: None,
                height: None,
                ..video_stream("cinepak", 0, 0, 0)
            }),
            vec![],
        ));
        match plan {
            // 1920x1080 default lands on the HEVC/12000k rung.
            PlaybackPlan::Transcode(request) => {
                assert_eq!(request.video_codec, VideoCodecTarget::Hevc);
                assert_eq!(request.video_bitrate, "12000k");
            }
            other => panic!("expected transcode, got {:?}", other),
        }
    }

    #[test]
    fn test_no_video_stream_transcodes() {
        let plan = PlaybackPlanner::plan_for_profile(&profile(
            "matroska,webm",
            None,
            vec![audio_stream("aac", 0)],
        ));
        assert!(matches!(plan, PlaybackPlan::Transcode(_)));
    }

    #[test]
    fn test_fallback_prefers_direct_extension() {
        let error = InspectError::ToolMissing("ffprobe".to_string());
        let plan = PlaybackPlanner::fallback_plan(Path::new("/m/movie.mp4"), &error);
        assert_eq!(plan, PlaybackPlan::Direct(PathBuf::from("/m/movie.mp4")));
    }

    #[test]
    fn test_fallback_remuxes_recognized_extension() {
        let error = InspectError::ToolMissing("ffprobe".to_string());
        let plan = PlaybackPlanner::fallback_plan(Path::new("/m/movie.mkv"), &error);
        match plan {
            PlaybackPlan::Remux(request) => {
                assert_eq!(request.video_stream, None);
                assert_eq!(request.audio_stream, None);
                assert_eq!(request.video_codec, None);
            }
            other => panic!("expected remux, got {:?}", other),
        }
    }

    #[test]
    fn test_fallback_transcodes_unknown_extension() {
        let error = InspectError::ToolMissing("ffprobe".to_string());
        let plan = PlaybackPlanner::fallback_plan(Path::new("/m/movie.xyz"), &error);
        match plan {
            PlaybackPlan::Transcode(request) => {
                assert_eq!(request.video_codec, VideoCodecTarget::H264);
                assert_eq!(request.video_bitrate, "10000k");
                assert_eq!(request.buffer_size, "20000k");
                assert_eq!(request.output, OutputMode::Hls);
            }
            other => panic!("expected transcode, got {:?}", other),
        }
    }
}
