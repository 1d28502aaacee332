//! Renderer bridge trait and supporting types.
//!
//! The playback core never draws frames itself; it prepares a stream URL and
//! hands it to a host-provided renderer. These abstractions let the core
//! drive any native playback surface while preserving a consistent,
//! async-first API. Host applications provide the concrete implementation
//! that satisfies their platform (AVPlayer-style engine, GStreamer sink,
//! test double).

use crate::error::Result;
use std::time::Duration;
use tokio::sync::mpsc;
use uuid::Uuid;

/// Unique identifier for renderer sessions managed by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RendererSessionId(Uuid);

impl RendererSessionId {
    /// Generate a new session identifier.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Construct an identifier from an existing UUID.
    pub fn from_uuid(id: Uuid) -> Self {
        Self(id)
    }

    /// Borrow the underlying UUID.
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for RendererSessionId {
    fn default() -> Self {
        Self::new()
    }
}

/// Notifications the renderer posts back to the core.
///
/// The core wires a single sink per playback session and clears it during
/// teardown; the renderer must stop posting after [`VideoRenderer::detach`].
#[derive(Debug, Clone, PartialEq)]
pub enum RendererEvent {
    /// The renderer buffered enough media to begin playback. Seeking is
    /// allowed from this point on.
    ReadyToPlay,
    /// Periodic playback-clock update.
    TimeChanged { seconds: f64 },
    /// The stream played to its end.
    PlaybackEnded,
    /// The renderer hit a fatal error and released the stream.
    Failed { message: String },
}

/// Channel on which a renderer posts [`RendererEvent`]s.
pub type RendererEventSink = mpsc::UnboundedSender<RendererEvent>;

/// Request describing the stream a renderer should attach to.
#[derive(Debug, Clone)]
pub struct RenderRequest {
    /// URL of the prepared stream. Either the original `file://` source for
    /// a direct plan, or a loopback HTTP URL for processed output.
    pub url: String,
    /// Position to start playback from, when resuming.
    pub start_position: Option<Duration>,
}

impl RenderRequest {
    /// Construct a request starting at the beginning of the stream.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            start_position: None,
        }
    }

    /// Attach a resume position to the request.
    pub fn with_start_position(mut self, position: Duration) -> Self {
        self.start_position = Some(position);
        self
    }
}

/// Trait for host-provided playback surfaces.
///
/// Implementations own the native playback engine. All methods are invoked
/// from the core's control task; implementations must tolerate `detach`
/// without a prior `attach` (teardown is unconditional).
#[async_trait::async_trait]
pub trait VideoRenderer: Send + Sync {
    /// Attach the renderer to a prepared stream and wire the event sink.
    /// Replaces any previously attached stream.
    async fn attach(&self, request: RenderRequest, events: RendererEventSink) -> Result<RendererSessionId>;

    /// Seek to an absolute position within the attached stream.
    async fn seek(&self, position: Duration) -> Result<()>;

    /// Detach from the current stream and clear the event sink. Idempotent.
    async fn detach(&self);
}
