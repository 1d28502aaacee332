//! Processing coordinator.
//!
//! Owns the lifecycle of one external-processor job: a fresh UUID-named
//! scratch directory under the scratch root, the child process itself, a
//! stderr drain (the processor stalls if its pipe fills), and the readiness
//! protocol that decides when the output is safe to hand to the renderer.
//!
//! File outputs are ready on clean exit with the output present. HLS outputs
//! are ready as soon as the playlist records its first segment; the process
//! keeps appending segments after handoff, and a later non-zero exit is
//! logged but no longer propagated.

use crate::args::{self, FILE_OUTPUT_NAME, HLS_PLAYLIST_NAME};
use crate::artifact::ProcessingArtifact;
use crate::error::{ProcessingError, Result};
use crate::task::ProcessingTask;
use core_media::plan::{OutputMode, RemuxRequest, TranscodeRequest};
use core_runtime::config::CoreConfig;
use parking_lot::Mutex;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::AsyncReadExt;
use tokio::process::{Child, Command};
use tokio::task::JoinHandle;
use tokio::time::{sleep, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Upper bound on the retained stderr tail attached to failures.
const STDERR_TAIL_LIMIT: usize = 2048;

/// A processing job the coordinator accepts.
#[derive(Debug, Clone)]
pub enum ProcessingRequest {
    Remux(RemuxRequest),
    Transcode(TranscodeRequest),
}

impl ProcessingRequest {
    /// Source file the job transforms.
    pub fn source(&self) -> &Path {
        match self {
            ProcessingRequest::Remux(r) => &r.source,
            ProcessingRequest::Transcode(t) => &t.source,
        }
    }

    fn label(&self) -> &'static str {
        match self {
            ProcessingRequest::Remux(_) => "remux",
            ProcessingRequest::Transcode(_) => "transcode",
        }
    }
}

impl From<RemuxRequest> for ProcessingRequest {
    fn from(request: RemuxRequest) -> Self {
        ProcessingRequest::Remux(request)
    }
}

impl From<TranscodeRequest> for ProcessingRequest {
    fn from(request: TranscodeRequest) -> Self {
        ProcessingRequest::Transcode(request)
    }
}

/// A launched job: its cancellation handle plus the pending artifact.
pub struct PreparedStream {
    /// Cancellation handle for the job.
    pub task: ProcessingTask,
    /// Resolves once the output is ready (or the job failed).
    pub artifact: JoinHandle<Result<ProcessingArtifact>>,
}

/// Drives the external media processor.
///
/// Stateless across jobs beyond the scratch root; every call to
/// [`prepare_stream`](Self::prepare_stream) is independent.
#[derive(Debug, Clone)]
pub struct StreamProcessor {
    ffmpeg: PathBuf,
    scratch_root: PathBuf,
    hls_segment_seconds: u32,
    hls_ready_timeout: Duration,
    hls_poll_interval: Duration,
}

impl StreamProcessor {
    /// Create a coordinator running the processor binary at `ffmpeg`.
    pub fn new(ffmpeg: impl Into<PathBuf>, config: &CoreConfig) -> Self {
        Self {
            ffmpeg: ffmpeg.into(),
            scratch_root: config.scratch_root.clone(),
            hls_segment_seconds: config.hls_segment_seconds,
            hls_ready_timeout: config.hls_ready_timeout,
            hls_poll_interval: config.hls_poll_interval,
        }
    }

    /// Launch a processing job.
    ///
    /// Returns immediately; the caller awaits the artifact and may cancel
    /// through the task handle at any point. A job cancelled before the
    /// child process spawns still tears down promptly.
    pub fn prepare_stream(&self, request: impl Into<ProcessingRequest>) -> PreparedStream {
        let request = request.into();
        let task = ProcessingTask::new();
        let token = task.token();
        let coordinator = self.clone();

        let artifact = tokio::spawn(async move { coordinator.run_job(request, token).await });

        PreparedStream { task, artifact }
    }

    async fn run_job(
        &self,
        request: ProcessingRequest,
        token: CancellationToken,
    ) -> Result<ProcessingArtifact> {
        let scratch = self.scratch_root.join(Uuid::new_v4().to_string());
        tokio::fs::create_dir_all(&scratch).await?;

        if token.is_cancelled() {
            remove_scratch(&scratch).await;
            return Err(ProcessingError::Cancelled);
        }

        let (argv, output) = match &request {
            ProcessingRequest::Remux(remux) => {
                (args::remux_args(remux, &scratch), OutputMode::Progressive)
            }
            ProcessingRequest::Transcode(transcode) => (
                args::transcode_args(transcode, &scratch, self.hls_segment_seconds),
                transcode.output,
            ),
        };

        info!(
            job = request.label(),
            source = %request.source().display(),
            scratch = %scratch.display(),
            "Launching media processor"
        );

        let mut child = match Command::new(&self.ffmpeg)
            .args(&argv)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
        {
            Ok(child) => child,
            Err(e) => {
                remove_scratch(&scratch).await;
                return Err(ProcessingError::Spawn(format!(
                    "{}: {}",
                    self.ffmpeg.display(),
                    e
                )));
            }
        };

        let capture = drain_stderr(&mut child);

        match output {
            OutputMode::Progressive => self.wait_for_file(child, scratch, &token, capture).await,
            OutputMode::Hls => {
                self.wait_for_playlist(child, scratch, &token, capture)
                    .await
            }
        }
    }

    /// File-output readiness: process exit decides.
    async fn wait_for_file(
        &self,
        mut child: Child,
        scratch: PathBuf,
        token: &CancellationToken,
        capture: StderrCapture,
    ) -> Result<ProcessingArtifact> {
        let status = tokio::select! {
            status = child.wait() => status?,
            _ = token.cancelled() => {
                terminate(&mut child).await;
                remove_scratch(&scratch).await;
                return Err(ProcessingError::Cancelled);
            }
        };

        if status.success() {
            let output = scratch.join(FILE_OUTPUT_NAME);
            if output.is_file() {
                info!(output = %output.display(), "Processing output ready");
                return Ok(ProcessingArtifact::file(scratch, output));
            }
            remove_scratch(&scratch).await;
            return Err(ProcessingError::OutputMissing);
        }

        let tail = capture.into_tail().await;
        remove_scratch(&scratch).await;
        Err(ProcessingError::Failed {
            exit_code: status.code(),
            stderr_tail: tail,
        })
    }

    /// HLS readiness: the playlist must record its first segment before the
    /// deadline; the process keeps running after handoff.
    async fn wait_for_playlist(
        &self,
        mut child: Child,
        scratch: PathBuf,
        token: &CancellationToken,
        capture: StderrCapture,
    ) -> Result<ProcessingArtifact> {
        let playlist = scratch.join(HLS_PLAYLIST_NAME);
        let deadline = Instant::now() + self.hls_ready_timeout;

        loop {
            if playlist_ready(&playlist).await {
                break;
            }

            match child.try_wait() {
                Ok(Some(status)) if status.success() => {
                    // Exited cleanly between polls; the playlist is final.
                    if playlist_ready(&playlist).await {
                        break;
                    }
                    remove_scratch(&scratch).await;
                    return Err(ProcessingError::OutputMissing);
                }
                Ok(Some(status)) => {
                    let tail = capture.into_tail().await;
                    remove_scratch(&scratch).await;
                    return Err(ProcessingError::Failed {
                        exit_code: status.code(),
                        stderr_tail: tail,
                    });
                }
                Ok(None) => {}
                Err(e) => {
                    terminate(&mut child).await;
                    remove_scratch(&scratch).await;
                    return Err(ProcessingError::Io(e));
                }
            }

            if Instant::now() >= deadline {
                warn!(playlist = %playlist.display(), "HLS playlist missed its readiness deadline");
                terminate(&mut child).await;
                remove_scratch(&scratch).await;
                return Err(ProcessingError::OutputMissing);
            }

            tokio::select! {
                _ = sleep(self.hls_poll_interval) => {}
                _ = token.cancelled() => {
                    terminate(&mut child).await;
                    remove_scratch(&scratch).await;
                    return Err(ProcessingError::OutputMissing);
                }
            }
        }

        info!(playlist = %playlist.display(), "HLS stream ready");
        let artifact = ProcessingArtifact::hls(scratch.clone(), scratch, HLS_PLAYLIST_NAME);

        // The artifact is in use from here on; a later failure is logged
        // but no longer propagated.
        let watch_token = token.clone();
        tokio::spawn(async move {
            tokio::select! {
                status = child.wait() => match status {
                    Ok(status) if status.success() => {
                        debug!("Processor finished appending segments");
                    }
                    Ok(status) => {
                        warn!(code = ?status.code(), "Processor exited non-zero after handoff");
                    }
                    Err(e) => warn!(error = %e, "Failed to reap processor"),
                },
                _ = watch_token.cancelled() => {
                    terminate(&mut child).await;
                    debug!("Processor terminated after cancellation");
                }
            }
        });

        Ok(artifact)
    }
}

/// Live capture of the processor's diagnostics.
struct StderrCapture {
    tail: Arc<Mutex<Vec<u8>>>,
    reader: Option<JoinHandle<()>>,
}

impl StderrCapture {
    /// Wait for the drain to reach EOF, then return the captured tail (or
    /// `"unknown error"` when nothing usable was written).
    async fn into_tail(mut self) -> String {
        if let Some(reader) = self.reader.take() {
            let _ = reader.await;
        }
        let bytes = self.tail.lock();
        let text = String::from_utf8_lossy(&bytes);
        let text = text.trim();
        if text.is_empty() {
            "unknown error".to_string()
        } else {
            text.to_string()
        }
    }
}

/// Spawn a reader that mirrors processor diagnostics into the log and keeps
/// a bounded tail for error reporting. The reader also prevents the child
/// from stalling on a full pipe buffer.
fn drain_stderr(child: &mut Child) -> StderrCapture {
    let tail = Arc::new(Mutex::new(Vec::new()));

    let reader = child.stderr.take().map(|mut stderr| {
        let sink = Arc::clone(&tail);
        tokio::spawn(async move {
            let mut buf = [0u8; 8192];
            loop {
                match stderr.read(&mut buf).await {
                    Ok(0) | Err(_) => break,
                    Ok(n) => {
                        let chunk = String::from_utf8_lossy(&buf[..n]);
                        let trimmed = chunk.trim_end();
                        if !trimmed.is_empty() {
                            debug!(target: "vplayer::processor", "{}", trimmed);
                        }

                        let mut sink = sink.lock();
                        sink.extend_from_slice(&buf[..n]);
                        if sink.len() > STDERR_TAIL_LIMIT {
                            let excess = sink.len() - STDERR_TAIL_LIMIT;
                            sink.drain(..excess);
                        }
                    }
                }
            }
        })
    });

    StderrCapture { tail, reader }
}

async fn playlist_ready(playlist: &Path) -> bool {
    match tokio::fs::read_to_string(playlist).await {
        Ok(content) => content.contains("#EXTINF"),
        Err(_) => false,
    }
}

async fn terminate(child: &mut Child) {
    if child.start_kill().is_ok() {
        let _ = child.wait().await;
    }
}

async fn remove_scratch(scratch: &Path) {
    if let Err(e) = tokio::fs::remove_dir_all(scratch).await {
        if e.kind() != std::io::ErrorKind::NotFound {
            warn!(dir = %scratch.display(), error = %e, "Failed to remove scratch directory");
        }
    }
}
