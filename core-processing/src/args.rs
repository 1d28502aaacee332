//! Processor argument vectors.
//!
//! Builds the exact command lines handed to the external media processor.
//! Remux jobs copy both bitstreams into a faststart MP4; transcode jobs
//! re-encode with the planner's codec/bitrate parameters into either a
//! progressive MP4 or an event-style HLS playlist.

use core_media::plan::{AudioCodecTarget, OutputMode, RemuxRequest, TranscodeRequest, VideoCodecTarget};
use std::path::Path;

/// Output file name for single-file jobs.
pub const FILE_OUTPUT_NAME: &str = "output.mp4";

/// Playlist file name for HLS jobs.
pub const HLS_PLAYLIST_NAME: &str = "master.m3u8";

/// Segment file-name pattern for HLS jobs.
pub const HLS_SEGMENT_PATTERN: &str = "segment_%05d.ts";

/// Argument vector for a remux job writing `<scratch>/output.mp4`.
pub fn remux_args(request: &RemuxRequest, scratch: &Path) -> Vec<String> {
    let mut args: Vec<String> = vec![
        "-hide_banner".into(),
        "-loglevel".into(),
        "warning".into(),
        "-y".into(),
        "-i".into(),
        request.source.to_string_lossy().into_owned(),
    ];

    // Explicit indices from the probe are absolute stream indices; without
    // them the default selectors pick the first video and an optional first
    // audio stream.
    match request.video_stream {
        Some(index) => args.extend(["-map".into(), format!("0:{}", index)]),
        None => args.extend(["-map".into(), "0:v:0".into()]),
    }
    match request.audio_stream {
        Some(index) => args.extend(["-map".into(), format!("0:{}", index)]),
        None => args.extend(["-map".into(), "0:a:0?".into()]),
    }

    args.extend([
        "-c:v".into(),
        "copy".into(),
        "-c:a".into(),
        "copy".into(),
        "-movflags".into(),
        "faststart".into(),
    ]);

    if request.is_hevc() {
        args.extend(["-tag:v".into(), "hvc1".into()]);
    }

    args.push(scratch.join(FILE_OUTPUT_NAME).to_string_lossy().into_owned());
    args
}

/// Argument vector for a transcode job writing into `scratch`.
pub fn transcode_args(
    request: &TranscodeRequest,
    scratch: &Path,
    hls_segment_seconds: u32,
) -> Vec<String> {
    let mut args: Vec<String> = vec!["-hide_banner".into(), "-loglevel".into(), "info".into()];

    if request.hardware_accelerated {
        args.extend(["-hwaccel".into(), hwaccel_name().into()]);
    }

    args.extend([
        "-y".into(),
        "-i".into(),
        request.source.to_string_lossy().into_owned(),
        "-map".into(),
        "0:v:0".into(),
        "-map".into(),
        "0:a:0?".into(),
        "-c:v".into(),
        video_encoder(request.video_codec, request.hardware_accelerated).into(),
        "-b:v".into(),
        request.video_bitrate.clone(),
        "-maxrate".into(),
        request.video_bitrate.clone(),
        "-bufsize".into(),
        request.buffer_size.clone(),
        "-pix_fmt".into(),
        "yuv420p".into(),
    ]);

    if request.video_codec == VideoCodecTarget::Hevc {
        args.extend(["-tag:v".into(), "hvc1".into()]);
    }

    if let Some(filter) = &request.scale_filter {
        args.extend(["-vf".into(), filter.clone()]);
    }

    args.extend([
        "-c:a".into(),
        audio_encoder(request.audio_codec).into(),
        "-b:a".into(),
        request.audio_bitrate.clone(),
    ]);

    match request.output {
        OutputMode::Progressive => {
            args.extend([
                "-movflags".into(),
                "faststart".into(),
                scratch.join(FILE_OUTPUT_NAME).to_string_lossy().into_owned(),
            ]);
        }
        OutputMode::Hls => {
            args.extend([
                "-f".into(),
                "hls".into(),
                "-hls_time".into(),
                hls_segment_seconds.to_string(),
                "-hls_playlist_type".into(),
                "event".into(),
                "-hls_flags".into(),
                "independent_segments+append_list".into(),
                "-hls_segment_filename".into(),
                scratch.join(HLS_SEGMENT_PATTERN).to_string_lossy().into_owned(),
                scratch.join(HLS_PLAYLIST_NAME).to_string_lossy().into_owned(),
            ]);
        }
    }

    args
}

/// Hardware-decode hint for the current platform.
fn hwaccel_name() -> &'static str {
    if cfg!(target_os = "macos") {
        "videotoolbox"
    } else {
        "auto"
    }
}

/// Encoder for the target codec; VideoToolbox when the platform offers it
/// and the request asked for hardware encoding, software otherwise.
fn video_encoder(codec: VideoCodecTarget, hardware: bool) -> &'static str {
    if hardware && cfg!(target_os = "macos") {
        match codec {
            VideoCodecTarget::H264 => "h264_videotoolbox",
            VideoCodecTarget::Hevc => "hevc_videotoolbox",
        }
    } else {
        match codec {
            VideoCodecTarget::H264 => "libx264",
            VideoCodecTarget::Hevc => "libx265",
        }
    }
}

fn audio_encoder(codec: AudioCodecTarget) -> &'static str {
    match codec {
        AudioCodecTarget::Aac => "aac",
        AudioCodecTarget::Ac3 => "ac3",
    }
}
