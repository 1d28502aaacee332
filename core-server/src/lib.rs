//! # Core Server Module
//!
//! Loopback HTTP service that exposes processed media back to the renderer.
//!
//! ## Overview
//!
//! The renderer only consumes seekable HTTP resources, so every processed
//! artifact - a remuxed MP4 or an HLS playlist with its segments - is
//! registered here and served from `127.0.0.1`. One shared listener carries
//! every session; sessions are keyed by UUID and live from registration
//! until their [`StreamHandle`](session::StreamHandle) is cleaned up.
//!
//! - `/stream/{id}` serves a single file with HTTP byte-range support
//! - `/hls/{id}` and `/hls/{id}/{path}` serve a playlist directory
//!
//! The listener is created lazily on the first registration. The configured
//! port is attempted first; when it is taken, an ephemeral port is bound
//! instead and recorded in every returned URL.

pub mod error;
pub mod range;
pub mod server;
pub mod session;

pub use error::{Result, ServerError};
pub use range::RangeOutcome;
pub use server::StreamServer;
pub use session::StreamHandle;
