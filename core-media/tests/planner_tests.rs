//! Planner tests through a real inspector invocation, with the probe binary
//! replaced by scripts that print canned JSON or fail outright.

#![cfg(unix)]

use core_media::plan::PlaybackPlan;
use core_media::{MediaInspector, PlaybackPlanner};
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

fn write_script(dir: &Path, name: &str, body: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, format!("#!/bin/sh\n{}\n", body)).unwrap();
    let mut perms = std::fs::metadata(&path).unwrap().permissions();
    perms.set_mode(0o755);
    std::fs::set_permissions(&path, perms).unwrap();
    path
}

fn planner_with_json(dir: &Path, json: &str) -> PlaybackPlanner {
    let script = write_script(dir, "fake-ffprobe", &format!("cat <<'EOF'\n{}\nEOF", json));
    PlaybackPlanner::new(MediaInspector::new(script))
}

fn failing_planner(dir: &Path) -> PlaybackPlanner {
    let script = write_script(dir, "fake-ffprobe-broken", "exit 1");
    PlaybackPlanner::new(MediaInspector::new(script))
}

const DIRECT_JSON: &str = r#"{
  "streams": [
    { "index": 0, "codec_type": "video", "codec_name": "h264", "width": 1920, "height": 1080 },
    { "index": 1, "codec_type": "audio", "codec_name": "aac", "channels": 2 }
  ],
  "format": { "format_name": "mov,mp4,m4a" }
}"#;

const MKV_JSON: &str = r#"{
  "streams": [
    { "index": 0, "codec_type": "video", "codec_name": "hevc", "width": 3840, "height": 2160 },
    { "index": 1, "codec_type": "audio", "codec_name": "dts", "channels": 6 },
    { "index": 2, "codec_type": "audio", "codec_name": "ac3", "channels": 6 }
  ],
  "format": { "format_name": "matroska,webm" }
}"#;

#[tokio::test]
async fn probed_direct_file_plans_direct() {
    let dir = TempDir::new().unwrap();
    let planner = planner_with_json(dir.path(), DIRECT_JSON);

    let plan = planner.plan(Path::new("/m/movie.mp4")).await;
    assert_eq!(plan, PlaybackPlan::Direct(PathBuf::from("/m/movie.mp4")));
}

#[tokio::test]
async fn probed_mkv_plans_remux_with_stream_indices() {
    let dir = TempDir::new().unwrap();
    let planner = planner_with_json(dir.path(), MKV_JSON);

    match planner.plan(Path::new("/m/movie.mkv")).await {
        PlaybackPlan::Remux(request) => {
            assert_eq!(request.video_stream, Some(0));
            // First *direct-playable* audio stream, not the first stream.
            assert_eq!(request.audio_stream, Some(2));
            assert!(request.is_hevc());
        }
        other => panic!("expected remux, got {:?}", other),
    }
}

#[tokio::test]
async fn probe_failure_falls_back_to_extension_heuristic() {
    let dir = TempDir::new().unwrap();
    let planner = failing_planner(dir.path());

    assert_eq!(
        planner.plan(Path::new("/m/movie.mp4")).await,
        PlaybackPlan::Direct(PathBuf::from("/m/movie.mp4"))
    );
    assert!(matches!(
        planner.plan(Path::new("/m/movie.mkv")).await,
        PlaybackPlan::Remux(_)
    ));
    assert!(matches!(
        planner.plan(Path::new("/m/movie.xyz")).await,
        PlaybackPlan::Transcode(_)
    ));
}

#[tokio::test]
async fn forced_plan_is_transcode_even_for_direct_media() {
    let dir = TempDir::new().unwrap();
    let planner = planner_with_json(dir.path(), DIRECT_JSON);

    match planner.forced_transcode_plan(Path::new("/m/movie.mp4")).await {
        PlaybackPlan::Transcode(request) => {
            // Parameters still come from the probed 1080p dimensions.
            assert_eq!(request.video_bitrate, "12000k");
        }
        other => panic!("expected transcode, got {:?}", other),
    }
}

#[tokio::test]
async fn forced_plan_is_transcode_when_probe_fails() {
    let dir = TempDir::new().unwrap();
    let planner = failing_planner(dir.path());

    match planner.forced_transcode_plan(Path::new("/m/movie.mp4")).await {
        PlaybackPlan::Transcode(request) => {
            assert_eq!(request.video_bitrate, "10000k");
            assert_eq!(request.buffer_size, "20000k");
        }
        other => panic!("expected transcode, got {:?}", other),
    }
}
