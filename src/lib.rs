//! Workspace facade crate.
//!
//! Re-exports the individual workspace crates so a host application can
//! depend on `vplayer-workspace` alone and assemble the playback pipeline
//! without wiring each crate individually.
//!
//! The usual entry point is
//! [`core_session::PlaybackController::from_config`], handing it the host's
//! renderer and file-access bridges:
//!
//! ```no_run
//! use std::sync::Arc;
//! use vplayer_workspace::bridge_traits::FilesystemAccess;
//! use vplayer_workspace::core_runtime::config::CoreConfig;
//! use vplayer_workspace::core_session::PlaybackController;
//! # fn renderer() -> Arc<dyn vplayer_workspace::bridge_traits::VideoRenderer> { unimplemented!() }
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = CoreConfig::builder().build()?;
//! let controller =
//!     PlaybackController::from_config(&config, renderer(), Arc::new(FilesystemAccess))?;
//! # Ok(())
//! # }
//! ```

pub use bridge_traits;
pub use core_media;
pub use core_processing;
pub use core_runtime;
pub use core_server;
pub use core_session;
