//! External tool discovery.
//!
//! The pipeline shells out to two binaries - the probe and the media
//! processor. Hosts may pin their locations through [`CoreConfig`]; when
//! they don't, the locator searches, in order: the player-specific
//! environment overrides, the generic environment overrides, a `tools`
//! directory bundled next to the executable, then the well-known package
//! manager install prefixes.

use crate::error::{InspectError, Result};
use core_runtime::config::CoreConfig;
use std::path::{Path, PathBuf};
use tracing::debug;

const FFMPEG_ENV_OVERRIDES: &[&str] = &["VPLAYER_FFMPEG_PATH", "FFMPEG_PATH"];
const FFPROBE_ENV_OVERRIDES: &[&str] = &["VPLAYER_FFPROBE_PATH", "FFPROBE_PATH"];

const SEARCH_DIRS: &[&str] = &[
    "/opt/homebrew/bin",
    "/usr/local/bin",
    "/opt/local/bin",
    "/usr/bin",
];

/// Resolved locations of the external media tools.
#[derive(Debug, Clone)]
pub struct MediaTools {
    /// Path of the media processor binary.
    pub ffmpeg: PathBuf,
    /// Path of the probe binary.
    pub ffprobe: PathBuf,
}

impl MediaTools {
    /// Resolve both tools from configuration overrides, falling back to the
    /// search order for any tool the configuration leaves unset.
    ///
    /// # Errors
    ///
    /// Returns [`InspectError::ToolMissing`] naming the binary that could
    /// not be found anywhere.
    pub fn from_config(config: &CoreConfig) -> Result<Self> {
        let ffmpeg = match &config.ffmpeg_path {
            Some(path) => path.clone(),
            None => locate_tool("ffmpeg", FFMPEG_ENV_OVERRIDES)?,
        };
        let ffprobe = match &config.ffprobe_path {
            Some(path) => path.clone(),
            None => locate_tool("ffprobe", FFPROBE_ENV_OVERRIDES)?,
        };
        Ok(Self { ffmpeg, ffprobe })
    }

    /// Resolve both tools purely through the search order.
    pub fn locate() -> Result<Self> {
        Ok(Self {
            ffmpeg: locate_tool("ffmpeg", FFMPEG_ENV_OVERRIDES)?,
            ffprobe: locate_tool("ffprobe", FFPROBE_ENV_OVERRIDES)?,
        })
    }
}

/// Search for one tool by binary name.
fn locate_tool(name: &str, env_overrides: &[&str]) -> Result<PathBuf> {
    for var in env_overrides {
        if let Ok(value) = std::env::var(var) {
            let path = PathBuf::from(value);
            if path.is_file() {
                debug!(tool = name, var, path = %path.display(), "Located tool via environment");
                return Ok(path);
            }
        }
    }

    if let Some(bundled) = bundled_dir() {
        let candidate = bundled.join(name);
        if candidate.is_file() {
            debug!(tool = name, path = %candidate.display(), "Located bundled tool");
            return Ok(candidate);
        }
    }

    for dir in SEARCH_DIRS {
        let candidate = Path::new(dir).join(name);
        if candidate.is_file() {
            debug!(tool = name, path = %candidate.display(), "Located installed tool");
            return Ok(candidate);
        }
    }

    Err(InspectError::ToolMissing(format!(
        "{} not found; set {} or install it in one of {:?}",
        name, env_overrides[0], SEARCH_DIRS
    )))
}

/// `tools` directory shipped alongside the executable, when resolvable.
fn bundled_dir() -> Option<PathBuf> {
    std::env::current_exe()
        .ok()?
        .parent()
        .map(|dir| dir.join("tools"))
}
