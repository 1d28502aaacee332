//! # Core Media Module
//!
//! Media inspection and playback planning for the player core.
//!
//! ## Overview
//!
//! This crate decides *how* a local media file reaches the renderer:
//!
//! - **Format registry**: which file extensions the player recognizes, and
//!   which of those the renderer prefers to open directly
//! - **Media inspector**: probes a file with the external probe binary and
//!   builds a [`MediaProfile`](profile::MediaProfile)
//! - **Playback planner**: maps a profile to the cheapest viable
//!   [`PlaybackPlan`](plan::PlaybackPlan) - direct play, container remux, or
//!   a hardware-assisted transcode
//! - **Tool locator**: finds the external probe/processor binaries through
//!   environment overrides and well-known install locations
//!
//! The planner is pure with respect to the inspector result; everything else
//! in the pipeline consumes its plan without re-deriving format knowledge.

pub mod error;
pub mod format;
pub mod inspector;
pub mod locate;
pub mod plan;
pub mod planner;
pub mod profile;

pub use error::{InspectError, Result};
pub use format::VideoFormatSupport;
pub use inspector::MediaInspector;
pub use locate::MediaTools;
pub use plan::{
    AudioCodecTarget, ContainerFormat, OutputMode, PlaybackPlan, RemuxRequest, TranscodeRequest,
    VideoCodecTarget,
};
pub use planner::PlaybackPlanner;
pub use profile::{MediaProfile, MediaStreamInfo, MediaStreamKind};
