//! File-extension registry.
//!
//! The registry answers two questions the rest of the pipeline asks about a
//! path before (or instead of) probing it: is this a media file the player
//! recognizes at all, and does its container family prefer the renderer's
//! native direct path? It is the only component that reasons from the file
//! name; everything after it works from probe results.

use std::path::Path;

/// Extensions whose container family the renderer opens directly.
const DIRECT_EXTENSIONS: &[&str] = &["mp4", "m4v", "mov", "m4a"];

/// Recognized extensions that need processing before the renderer sees them.
const PROCESSING_EXTENSIONS: &[&str] = &[
    "mkv", "webm", "avi", "flv", "wmv", "asf", "ts", "m2ts", "mts", "mpg", "mpeg", "vob", "ogv",
    "ogm", "3gp", "divx", "rm", "rmvb",
];

/// Classification of file extensions the player accepts.
#[derive(Debug, Clone, Copy, Default)]
pub struct VideoFormatSupport;

impl VideoFormatSupport {
    /// Returns `true` when the extension belongs to a container family the
    /// renderer prefers to open without processing.
    pub fn prefers_direct(path: &Path) -> bool {
        Self::extension_of(path)
            .map(|ext| DIRECT_EXTENSIONS.contains(&ext.as_str()))
            .unwrap_or(false)
    }

    /// Returns `true` when the extension is one the player recognizes,
    /// whether or not it needs processing.
    pub fn is_recognized(path: &Path) -> bool {
        Self::extension_of(path)
            .map(|ext| {
                DIRECT_EXTENSIONS.contains(&ext.as_str())
                    || PROCESSING_EXTENSIONS.contains(&ext.as_str())
            })
            .unwrap_or(false)
    }

    /// All recognized extensions, direct-path first.
    pub fn recognized_extensions() -> impl Iterator<Item = &'static str> {
        DIRECT_EXTENSIONS
            .iter()
            .chain(PROCESSING_EXTENSIONS.iter())
            .copied()
    }

    fn extension_of(path: &Path) -> Option<String> {
        path.extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_ascii_lowercase())
    }
}
