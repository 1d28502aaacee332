//! # Event Bus System
//!
//! Provides an event-driven architecture for the playback core using
//! `tokio::sync::broadcast`. This module enables decoupled communication
//! between the session controller and the host UI layer through typed events.
//!
//! ## Overview
//!
//! The event bus system consists of:
//! - **Event Types**: Strongly-typed enum hierarchies for different domains
//! - **EventBus**: Central broadcast channel for publishing events
//! - **Subscription Management**: Multiple subscribers can listen independently
//!
//! The controller mutates its own state on its control task and posts the
//! externally visible transitions here; subscribers (typically the UI shell)
//! observe but never mutate pipeline state.
//!
//! ## Usage
//!
//! ```rust
//! use core_runtime::events::{BackendState, CoreEvent, EventBus, PlaybackEvent};
//!
//! let event_bus = EventBus::new(100);
//! let mut subscriber = event_bus.subscribe();
//!
//! event_bus
//!     .emit(CoreEvent::Playback(PlaybackEvent::StateChanged {
//!         state: BackendState::Preparing,
//!     }))
//!     .ok();
//! ```
//!
//! ## Error Handling
//!
//! The bus uses `tokio::sync::broadcast`: a subscriber that falls behind
//! receives `RecvError::Lagged(n)` (non-fatal, keep receiving) and
//! `RecvError::Closed` signals shutdown.

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

// Re-export commonly used types
pub use tokio::sync::broadcast::error::{RecvError, SendError};
pub use tokio::sync::broadcast::Receiver;

/// Default buffer size for the event bus channel.
pub const DEFAULT_EVENT_BUFFER_SIZE: usize = 100;

// ============================================================================
// Core Event Types
// ============================================================================

/// Externally visible state of the playback backend.
///
/// Transitions are serialized per session:
/// `Idle → Preparing → Active → (Completed) → Idle`. A `Direct` plan skips
/// `Preparing` and goes straight to `Active`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendState {
    /// No session loaded.
    Idle,
    /// A processing job or stream registration is in flight.
    Preparing,
    /// The renderer is attached and playing.
    Active,
    /// The stream played to its end; a replay countdown may be running.
    Completed,
}

impl BackendState {
    /// Get the string representation for display and logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            BackendState::Idle => "idle",
            BackendState::Preparing => "preparing",
            BackendState::Active => "active",
            BackendState::Completed => "completed",
        }
    }
}

impl std::fmt::Display for BackendState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Top-level event enum encompassing all event categories.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", content = "payload")]
pub enum CoreEvent {
    /// Playback-session events
    Playback(PlaybackEvent),
    /// Stream-processing events
    Processing(ProcessingEvent),
}

impl CoreEvent {
    /// Returns a human-readable description of the event.
    pub fn description(&self) -> &str {
        match self {
            CoreEvent::Playback(e) => e.description(),
            CoreEvent::Processing(e) => e.description(),
        }
    }
}

// ============================================================================
// Playback Events
// ============================================================================

/// Events emitted by the playback session controller.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "event")]
pub enum PlaybackEvent {
    /// Backend state transition.
    StateChanged {
        /// The state just entered.
        state: BackendState,
    },
    /// Periodic playback-clock update.
    Progress {
        /// Current position in seconds.
        seconds: f64,
    },
    /// The end-of-stream replay countdown ticked.
    ReplayCountdown {
        /// Seconds remaining until automatic replay.
        remaining_seconds: u64,
    },
    /// A user-visible failure was surfaced.
    Failed {
        /// Human-readable failure message.
        message: String,
    },
}

impl PlaybackEvent {
    fn description(&self) -> &str {
        match self {
            PlaybackEvent::StateChanged { .. } => "Backend state changed",
            PlaybackEvent::Progress { .. } => "Playback position updated",
            PlaybackEvent::ReplayCountdown { .. } => "Replay countdown tick",
            PlaybackEvent::Failed { .. } => "Playback failed",
        }
    }
}

// ============================================================================
// Processing Events
// ============================================================================

/// Events describing the lifecycle of a stream-processing job.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "event")]
pub enum ProcessingEvent {
    /// A processing job was launched.
    Started {
        /// Source file the job transforms.
        source: String,
    },
    /// The job's artifact became ready to serve.
    Ready {
        /// Source file the job transformed.
        source: String,
    },
    /// The job failed before producing a usable artifact.
    Failed {
        /// Source file the job was transforming.
        source: String,
        /// Human-readable failure message.
        message: String,
    },
    /// The job was cancelled by the controller.
    Cancelled {
        /// Source file the job was transforming.
        source: String,
    },
}

impl ProcessingEvent {
    fn description(&self) -> &str {
        match self {
            ProcessingEvent::Started { .. } => "Processing started",
            ProcessingEvent::Ready { .. } => "Processing artifact ready",
            ProcessingEvent::Failed { .. } => "Processing failed",
            ProcessingEvent::Cancelled { .. } => "Processing cancelled",
        }
    }
}

// ============================================================================
// Event Bus
// ============================================================================

/// Central broadcast channel for core events.
///
/// Fully thread-safe (`Send + Sync`); share across tasks with `Arc`.
pub struct EventBus {
    sender: broadcast::Sender<CoreEvent>,
}

impl EventBus {
    /// Creates a new event bus with the specified buffer size.
    ///
    /// When a subscriber falls behind by more than `capacity` events it
    /// receives a `RecvError::Lagged` error.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publishes an event to all subscribers.
    ///
    /// Returns the number of subscribers that received the event, or an
    /// error if there are no active subscribers.
    pub fn emit(&self, event: CoreEvent) -> Result<usize, SendError<CoreEvent>> {
        self.sender.send(event)
    }

    /// Creates a new subscriber to receive events.
    ///
    /// Each call creates an independent receiver that observes all future
    /// events. Past events are not replayed.
    pub fn subscribe(&self) -> Receiver<CoreEvent> {
        self.sender.subscribe()
    }

    /// Number of active subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_EVENT_BUFFER_SIZE)
    }
}
