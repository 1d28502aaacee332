//! # Core Runtime Module
//!
//! Provides foundational runtime infrastructure for the playback core:
//! - Logging and tracing infrastructure
//! - Configuration management
//! - Event bus system
//!
//! ## Overview
//!
//! This crate contains the core runtime utilities that the other modules
//! depend on. It establishes the async runtime patterns, logging
//! conventions, and event broadcasting mechanisms used throughout the
//! playback pipeline.

pub mod config;
pub mod error;
pub mod events;
pub mod logging;

pub use config::CoreConfig;
pub use error::{Error, Result};
pub use events::{BackendState, CoreEvent, EventBus, PlaybackEvent, ProcessingEvent};
