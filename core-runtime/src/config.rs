//! # Core Configuration Module
//!
//! Provides configuration management for the playback core.
//!
//! ## Overview
//!
//! The configuration system uses a builder pattern to construct a
//! [`CoreConfig`] instance holding the settings every pipeline component
//! reads: external tool locations, the processing scratch root, the loopback
//! server port, the resume-history document path, and HLS readiness timing.
//! It enforces fail-fast validation so a misconfigured host errors at
//! startup rather than mid-playback.
//!
//! ## Usage
//!
//! ```no_run
//! use core_runtime::config::CoreConfig;
//!
//! let config = CoreConfig::builder()
//!     .server_port(39453)
//!     .build()
//!     .expect("Failed to build config");
//! ```
//!
//! Tool paths left unset are resolved later through the locator's search
//! order (environment overrides, bundled path, well-known directories).

use crate::error::{Error, Result};
use std::path::PathBuf;
use std::time::Duration;

/// Directory name for per-job scratch directories under the system temp root.
pub const SCRATCH_DIR_NAME: &str = "vplayer-processing";

/// Default loopback port for the stream server.
pub const DEFAULT_SERVER_PORT: u16 = 39453;

/// Core configuration for the playback pipeline.
///
/// Use [`CoreConfig::builder`] to construct instances.
#[derive(Debug, Clone)]
pub struct CoreConfig {
    /// Explicit path to the media processor binary; `None` means locate it.
    pub ffmpeg_path: Option<PathBuf>,

    /// Explicit path to the probe binary; `None` means locate it.
    pub ffprobe_path: Option<PathBuf>,

    /// Root directory for per-job scratch directories.
    pub scratch_root: PathBuf,

    /// Port the loopback stream server asks for. If the bind fails, an
    /// ephemeral port is used instead and recorded in returned URLs.
    pub server_port: u16,

    /// Path of the resume-history JSON document.
    pub history_path: PathBuf,

    /// Segment duration passed to the processor for HLS output.
    pub hls_segment_seconds: u32,

    /// How long to wait for an HLS playlist to record its first segment.
    pub hls_ready_timeout: Duration,

    /// Interval between playlist readiness polls.
    pub hls_poll_interval: Duration,
}

impl CoreConfig {
    /// Create a new configuration builder.
    pub fn builder() -> CoreConfigBuilder {
        CoreConfigBuilder::default()
    }
}

/// Builder for [`CoreConfig`].
#[derive(Debug, Default)]
pub struct CoreConfigBuilder {
    ffmpeg_path: Option<PathBuf>,
    ffprobe_path: Option<PathBuf>,
    scratch_root: Option<PathBuf>,
    server_port: Option<u16>,
    history_path: Option<PathBuf>,
    hls_segment_seconds: Option<u32>,
    hls_ready_timeout: Option<Duration>,
    hls_poll_interval: Option<Duration>,
}

impl CoreConfigBuilder {
    /// Explicit media-processor binary path.
    pub fn ffmpeg_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.ffmpeg_path = Some(path.into());
        self
    }

    /// Explicit probe binary path.
    pub fn ffprobe_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.ffprobe_path = Some(path.into());
        self
    }

    /// Root directory for processing scratch directories.
    pub fn scratch_root(mut self, path: impl Into<PathBuf>) -> Self {
        self.scratch_root = Some(path.into());
        self
    }

    /// Loopback port for the stream server.
    pub fn server_port(mut self, port: u16) -> Self {
        self.server_port = Some(port);
        self
    }

    /// Path of the resume-history document.
    pub fn history_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.history_path = Some(path.into());
        self
    }

    /// HLS segment duration in seconds.
    pub fn hls_segment_seconds(mut self, seconds: u32) -> Self {
        self.hls_segment_seconds = Some(seconds);
        self
    }

    /// HLS readiness timeout.
    pub fn hls_ready_timeout(mut self, timeout: Duration) -> Self {
        self.hls_ready_timeout = Some(timeout);
        self
    }

    /// HLS readiness poll interval.
    pub fn hls_poll_interval(mut self, interval: Duration) -> Self {
        self.hls_poll_interval = Some(interval);
        self
    }

    /// Validate and build the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] when an explicitly provided tool path does
    /// not exist, when no history location can be determined, or when the
    /// HLS timing values are inconsistent.
    pub fn build(self) -> Result<CoreConfig> {
        for (label, path) in [
            ("ffmpeg_path", &self.ffmpeg_path),
            ("ffprobe_path", &self.ffprobe_path),
        ] {
            if let Some(path) = path {
                if !path.exists() {
                    return Err(Error::Config(format!(
                        "{} does not exist: {}",
                        label,
                        path.display()
                    )));
                }
            }
        }

        let scratch_root = self
            .scratch_root
            .unwrap_or_else(|| std::env::temp_dir().join(SCRATCH_DIR_NAME));

        let history_path = match self.history_path {
            Some(path) => path,
            None => default_history_path().ok_or_else(|| {
                Error::Config(
                    "could not determine the application support directory; \
                     set history_path explicitly"
                        .to_string(),
                )
            })?,
        };

        let hls_poll_interval = self
            .hls_poll_interval
            .unwrap_or_else(|| Duration::from_millis(200));
        let hls_ready_timeout = self.hls_ready_timeout.unwrap_or_else(|| Duration::from_secs(8));

        if hls_poll_interval.is_zero() {
            return Err(Error::Config("hls_poll_interval must be non-zero".to_string()));
        }
        if hls_ready_timeout < hls_poll_interval {
            return Err(Error::Config(
                "hls_ready_timeout must be at least one poll interval".to_string(),
            ));
        }

        let hls_segment_seconds = self.hls_segment_seconds.unwrap_or(4);
        if hls_segment_seconds == 0 {
            return Err(Error::Config("hls_segment_seconds must be non-zero".to_string()));
        }

        Ok(CoreConfig {
            ffmpeg_path: self.ffmpeg_path,
            ffprobe_path: self.ffprobe_path,
            scratch_root,
            server_port: self.server_port.unwrap_or(DEFAULT_SERVER_PORT),
            history_path,
            hls_segment_seconds,
            hls_ready_timeout,
            hls_poll_interval,
        })
    }
}

/// `<application-support>/vPlayer/history.json` on the current platform.
fn default_history_path() -> Option<PathBuf> {
    dirs::data_dir().map(|dir| dir.join("vPlayer").join("history.json"))
}
