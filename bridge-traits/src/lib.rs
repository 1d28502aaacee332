//! # Host Bridge Traits
//!
//! Platform abstraction traits that must be implemented by the host
//! application embedding the playback core.
//!
//! ## Overview
//!
//! This crate defines the contract between the playback preparation pipeline
//! and the host shell. Each trait represents a capability the core requires
//! but that is owned by the host: the native frame renderer, scoped access to
//! user-selected files, and the playback-history store the resume feature
//! reads and writes.
//!
//! ## Traits
//!
//! - [`VideoRenderer`](renderer::VideoRenderer) - Native playback surface the
//!   core hands prepared stream URLs to
//! - [`SourceAccess`](access::SourceAccess) - Scoped file-access tokens for
//!   user-selected media
//! - [`ResumeStore`](history::ResumeStore) - Per-file playback offset
//!   persistence
//!
//! ## Fail-Fast Strategy
//!
//! The core fails fast with descriptive errors when a required capability is
//! missing or refuses an operation; see [`error::BridgeError`].

pub mod access;
pub mod error;
pub mod history;
pub mod renderer;

pub use access::{FilesystemAccess, SourceAccess, SourceToken};
pub use error::{BridgeError, Result};
pub use history::ResumeStore;
pub use renderer::{RenderRequest, RendererEvent, RendererEventSink, RendererSessionId, VideoRenderer};
