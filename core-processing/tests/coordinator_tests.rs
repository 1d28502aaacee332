//! End-to-end coordinator tests against a scripted stand-in for the media
//! processor. Each script mimics one behavior of the real binary: producing
//! the output file, failing with diagnostics, or appending HLS segments.

#![cfg(unix)]

use core_media::plan::{
    AudioCodecTarget, ContainerFormat, OutputMode, RemuxRequest, TranscodeRequest, VideoCodecTarget,
};
use core_processing::{ArtifactKind, PreparedStream, ProcessingError, StreamProcessor};
use core_runtime::config::CoreConfig;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tempfile::TempDir;

fn write_script(dir: &Path, body: &str) -> PathBuf {
    let path = dir.join("fake-processor");
    std::fs::write(&path, format!("#!/bin/sh\n{}\n", body)).unwrap();
    let mut perms = std::fs::metadata(&path).unwrap().permissions();
    perms.set_mode(0o755);
    std::fs::set_permissions(&path, perms).unwrap();
    path
}

fn test_config(root: &TempDir) -> CoreConfig {
    CoreConfig::builder()
        .scratch_root(root.path().join("scratch"))
        .history_path(root.path().join("history.json"))
        .hls_ready_timeout(Duration::from_secs(2))
        .hls_poll_interval(Duration::from_millis(50))
        .build()
        .unwrap()
}

fn remux_request() -> RemuxRequest {
    RemuxRequest {
        source: PathBuf::from("/media/input.mkv"),
        target: ContainerFormat::Mp4,
        video_stream: Some(0),
        audio_stream: Some(1),
        video_codec: Some("h264".to_string()),
    }
}

fn hls_transcode_request() -> TranscodeRequest {
    TranscodeRequest {
        source: PathBuf::from("/media/input.avi"),
        video_codec: VideoCodecTarget::H264,
        audio_codec: AudioCodecTarget::Aac,
        container: ContainerFormat::Mp4,
        video_bitrate: "10000k".to_string(),
        buffer_size: "20000k".to_string(),
        audio_bitrate: "192k".to_string(),
        scale_filter: None,
        hardware_accelerated: false,
        output: OutputMode::Hls,
    }
}

#[tokio::test]
async fn remux_success_yields_file_artifact() {
    let root = TempDir::new().unwrap();
    let config = test_config(&root);
    // Last argument is the output path.
    let script = write_script(root.path(), r#"for a; do out="$a"; done; echo mp4 > "$out""#);
    let processor = StreamProcessor::new(script, &config);

    let PreparedStream { task: _task, artifact } = processor.prepare_stream(remux_request());
    let artifact = artifact.await.unwrap().unwrap();

    match artifact.kind() {
        ArtifactKind::File(path) => {
            assert!(path.is_file());
            assert!(path.ends_with("output.mp4"));
            assert!(path.starts_with(&config.scratch_root));
        }
        other => panic!("expected file artifact, got {:?}", other),
    }

    let scratch = artifact.scratch_dir().to_path_buf();
    artifact.cleanup();
    assert!(!scratch.exists());
}

#[tokio::test]
async fn failed_job_reports_stderr_tail_and_removes_scratch() {
    let root = TempDir::new().unwrap();
    let config = test_config(&root);
    let script = write_script(root.path(), r#"echo "boom: unsupported codec" >&2; exit 3"#);
    let processor = StreamProcessor::new(script, &config);

    let PreparedStream { task: _task, artifact } = processor.prepare_stream(remux_request());
    let error = artifact.await.unwrap().unwrap_err();

    match error {
        ProcessingError::Failed {
            exit_code,
            stderr_tail,
        } => {
            assert_eq!(exit_code, Some(3));
            assert!(stderr_tail.contains("boom: unsupported codec"));
        }
        other => panic!("expected failure, got {:?}", other),
    }

    // Failure removed the per-job scratch directory.
    let leftovers: Vec<_> = std::fs::read_dir(&config.scratch_root)
        .map(|entries| entries.collect())
        .unwrap_or_default();
    assert!(leftovers.is_empty());
}

#[tokio::test]
async fn silent_failure_reports_unknown_error() {
    let root = TempDir::new().unwrap();
    let config = test_config(&root);
    let script = write_script(root.path(), "exit 1");
    let processor = StreamProcessor::new(script, &config);

    let PreparedStream { task: _task, artifact } = processor.prepare_stream(remux_request());
    match artifact.await.unwrap().unwrap_err() {
        ProcessingError::Failed { stderr_tail, .. } => {
            assert_eq!(stderr_tail, "unknown error");
        }
        other => panic!("expected failure, got {:?}", other),
    }
}

#[tokio::test]
async fn clean_exit_without_output_is_output_missing() {
    let root = TempDir::new().unwrap();
    let config = test_config(&root);
    let script = write_script(root.path(), "exit 0");
    let processor = StreamProcessor::new(script, &config);

    let PreparedStream { task: _task, artifact } = processor.prepare_stream(remux_request());
    assert!(matches!(
        artifact.await.unwrap().unwrap_err(),
        ProcessingError::OutputMissing
    ));
}

#[tokio::test]
async fn hls_artifact_waits_for_first_segment() {
    let root = TempDir::new().unwrap();
    let config = test_config(&root);
    // Write an empty playlist immediately, the first segment entry after a
    // delay, then keep running like an event stream.
    let script = write_script(
        root.path(),
        r#"for a; do out="$a"; done
printf '#EXTM3U\n' > "$out"
sleep 0.4
printf '#EXTINF:4.00000,\nsegment_00000.ts\n' >> "$out"
sleep 30"#,
    );
    let processor = StreamProcessor::new(script, &config);

    let started = std::time::Instant::now();
    let PreparedStream { task, artifact } = processor.prepare_stream(hls_transcode_request());
    let artifact = artifact.await.unwrap().unwrap();

    // Readiness required the #EXTINF entry, not just the playlist file.
    assert!(started.elapsed() >= Duration::from_millis(400));
    match artifact.kind() {
        ArtifactKind::Hls { directory, playlist } => {
            assert_eq!(playlist, "master.m3u8");
            let content = std::fs::read_to_string(directory.join(playlist)).unwrap();
            assert!(content.contains("#EXTINF"));
        }
        other => panic!("expected hls artifact, got {:?}", other),
    }

    // Cancelling after handoff terminates the still-running processor.
    task.cancel();
}

#[tokio::test]
async fn hls_readiness_timeout_is_output_missing() {
    let root = TempDir::new().unwrap();
    let config = CoreConfig::builder()
        .scratch_root(root.path().join("scratch"))
        .history_path(root.path().join("history.json"))
        .hls_ready_timeout(Duration::from_millis(300))
        .hls_poll_interval(Duration::from_millis(50))
        .build()
        .unwrap();
    let script = write_script(root.path(), "sleep 30");
    let processor = StreamProcessor::new(script, &config);

    let started = std::time::Instant::now();
    let PreparedStream { task: _task, artifact } = processor.prepare_stream(hls_transcode_request());
    let error = artifact.await.unwrap().unwrap_err();

    assert!(matches!(error, ProcessingError::OutputMissing));
    assert!(started.elapsed() < Duration::from_secs(5));

    let leftovers: Vec<_> = std::fs::read_dir(&config.scratch_root)
        .map(|entries| entries.collect())
        .unwrap_or_default();
    assert!(leftovers.is_empty());
}

#[tokio::test]
async fn cancelling_file_job_terminates_processor() {
    let root = TempDir::new().unwrap();
    let config = test_config(&root);
    let script = write_script(root.path(), "sleep 30");
    let processor = StreamProcessor::new(script, &config);

    let PreparedStream { task, artifact } = processor.prepare_stream(remux_request());
    tokio::time::sleep(Duration::from_millis(100)).await;
    task.cancel();
    task.cancel(); // second cancel is a no-op

    let error = artifact.await.unwrap().unwrap_err();
    assert!(matches!(error, ProcessingError::Cancelled));
}

#[tokio::test]
async fn cancelling_during_hls_poll_is_output_missing() {
    let root = TempDir::new().unwrap();
    let config = test_config(&root);
    let script = write_script(root.path(), "sleep 30");
    let processor = StreamProcessor::new(script, &config);

    let PreparedStream { task, artifact } = processor.prepare_stream(hls_transcode_request());
    tokio::time::sleep(Duration::from_millis(100)).await;
    task.cancel();

    let error = artifact.await.unwrap().unwrap_err();
    assert!(matches!(error, ProcessingError::OutputMissing));
}

#[tokio::test]
async fn missing_binary_is_spawn_error() {
    let root = TempDir::new().unwrap();
    let config = test_config(&root);
    let processor = StreamProcessor::new("/nonexistent/processor-binary", &config);

    let PreparedStream { task: _task, artifact } = processor.prepare_stream(remux_request());
    assert!(matches!(
        artifact.await.unwrap().unwrap_err(),
        ProcessingError::Spawn(_)
    ));
}
