//! # Core Session Module
//!
//! The playback session controller - the piece that threads one user-visible
//! intent ("play file X") through the whole preparation pipeline.
//!
//! ## Overview
//!
//! [`PlaybackController`](controller::PlaybackController) owns the active
//! session. A `load` tears down whatever came before, captures the stored
//! resume offset, asks the planner for the cheapest viable plan, drives the
//! processing coordinator when a transformation is needed, registers the
//! artifact with the loopback server, and finally hands the renderer a URL.
//!
//! The controller is also where failures become user-visible: a renderer
//! failure on a direct or remuxed stream escalates once to a forced
//! transcode; any later failure surfaces its message and returns to idle.
//! Teardown always releases resources in reverse order of acquisition.
//!
//! [`JsonHistoryStore`](history::JsonHistoryStore) implements the
//! host-facing [`ResumeStore`](bridge_traits::ResumeStore) contract over the
//! player's `history.json` document with atomic write-then-rename updates.

pub mod controller;
pub mod error;
pub mod history;

pub use controller::PlaybackController;
pub use core_runtime::events::BackendState;
pub use error::{Result, SessionError};
pub use history::{HistoryDocument, HistoryEntry, JsonHistoryStore};
