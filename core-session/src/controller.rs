//! Playback session controller.
//!
//! Threads one user intent through the pipeline: tear down the previous
//! session, capture the stored resume offset, plan, process if needed,
//! register the artifact with the loopback server, attach the renderer.
//!
//! State machine: `Idle → Preparing → Active → (Completed) → Idle`, with a
//! `Direct` plan skipping `Preparing`. Renderer callbacks are delivered on a
//! per-session pump task; each carries the source path captured at dispatch
//! time, and stale callbacks for a superseded source are dropped.
//!
//! Teardown order is fixed: detach renderer, cancel the processing task,
//! clean up the HTTP handle, run the artifact cleanup, release the source
//! access token, clear tracking. Every step is idempotent.

use crate::error::{Result, SessionError};
use crate::history::JsonHistoryStore;
use bridge_traits::access::{SourceAccess, SourceToken};
use bridge_traits::history::ResumeStore;
use bridge_traits::renderer::{RenderRequest, RendererEvent, VideoRenderer};
use core_media::inspector::MediaInspector;
use core_media::locate::MediaTools;
use core_media::plan::PlaybackPlan;
use core_media::planner::PlaybackPlanner;
use core_processing::{
    ArtifactKind, PreparedStream, ProcessingArtifact, ProcessingError, ProcessingRequest,
    ProcessingTask, StreamProcessor,
};
use core_runtime::config::CoreConfig;
use core_runtime::events::{BackendState, CoreEvent, EventBus, PlaybackEvent, ProcessingEvent};
use core_server::{StreamHandle, StreamServer};
use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Seconds counted down after end-of-stream before an automatic replay.
const REPLAY_COUNTDOWN_SECONDS: u64 = 3;

/// Minimum playback-clock advance between resume-offset persists.
const PERSIST_DELTA_SECONDS: f64 = 1.0;

/// Per-session tracking owned by the controller.
struct PlaybackSession {
    source: PathBuf,
    state: BackendState,
    plan: Option<PlaybackPlan>,
    access_token: Option<SourceToken>,
    task: Option<ProcessingTask>,
    artifact: Option<ProcessingArtifact>,
    http_handle: Option<StreamHandle>,
    renderer_attached: bool,
    pump_task: Option<JoinHandle<()>>,
    countdown_task: Option<JoinHandle<()>>,
    pending_resume: Option<f64>,
    last_persisted: Option<f64>,
    has_escalated: bool,
    awaiting_replay: bool,
}

impl PlaybackSession {
    fn new(source: PathBuf) -> Self {
        Self {
            source,
            state: BackendState::Idle,
            plan: None,
            access_token: None,
            task: None,
            artifact: None,
            http_handle: None,
            renderer_attached: false,
            pump_task: None,
            countdown_task: None,
            pending_resume: None,
            last_persisted: None,
            has_escalated: false,
            awaiting_replay: false,
        }
    }
}

#[derive(Default)]
struct SessionSlot {
    current: Option<PlaybackSession>,
}

impl SessionSlot {
    fn for_source(&self, source: &Path) -> Option<&PlaybackSession> {
        self.current.as_ref().filter(|s| s.source == source)
    }

    fn for_source_mut(&mut self, source: &Path) -> Option<&mut PlaybackSession> {
        self.current.as_mut().filter(|s| s.source == source)
    }
}

struct ControllerInner {
    planner: PlaybackPlanner,
    processor: StreamProcessor,
    server: StreamServer,
    renderer: Arc<dyn VideoRenderer>,
    access: Arc<dyn SourceAccess>,
    resume: Arc<dyn ResumeStore>,
    events: EventBus,
    slot: Mutex<SessionSlot>,
}

/// Orchestrates plan → processing → HTTP registration → renderer attach.
///
/// Cheap to clone; all clones drive the same session.
#[derive(Clone)]
pub struct PlaybackController {
    inner: Arc<ControllerInner>,
}

impl PlaybackController {
    /// Assemble a controller from explicit collaborators.
    pub fn new(
        planner: PlaybackPlanner,
        processor: StreamProcessor,
        server: StreamServer,
        renderer: Arc<dyn VideoRenderer>,
        access: Arc<dyn SourceAccess>,
        resume: Arc<dyn ResumeStore>,
        events: EventBus,
    ) -> Self {
        Self {
            inner: Arc::new(ControllerInner {
                planner,
                processor,
                server,
                renderer,
                access,
                resume,
                events,
                slot: Mutex::new(SessionSlot::default()),
            }),
        }
    }

    /// Assemble the whole pipeline from configuration: locate the external
    /// tools, build planner/processor/server, and open the history store.
    pub fn from_config(
        config: &CoreConfig,
        renderer: Arc<dyn VideoRenderer>,
        access: Arc<dyn SourceAccess>,
    ) -> Result<Self> {
        let tools = MediaTools::from_config(config)
            .map_err(|e| SessionError::Configuration(e.to_string()))?;

        let planner = PlaybackPlanner::new(MediaInspector::new(tools.ffprobe));
        let processor = StreamProcessor::new(tools.ffmpeg, config);
        let server = StreamServer::new(config.server_port);
        let resume: Arc<dyn ResumeStore> = Arc::new(JsonHistoryStore::new(&config.history_path));

        Ok(Self::new(
            planner,
            processor,
            server,
            renderer,
            access,
            resume,
            EventBus::default(),
        ))
    }

    /// Subscribe to controller events.
    pub fn subscribe(&self) -> core_runtime::events::Receiver<CoreEvent> {
        self.inner.events.subscribe()
    }

    /// Current backend state (`Idle` when no session is loaded).
    pub async fn state(&self) -> BackendState {
        self.inner
            .slot
            .lock()
            .await
            .current
            .as_ref()
            .map(|s| s.state)
            .unwrap_or(BackendState::Idle)
    }

    /// Source of the current session, if any.
    pub async fn current_source(&self) -> Option<PathBuf> {
        self.inner
            .slot
            .lock()
            .await
            .current
            .as_ref()
            .map(|s| s.source.clone())
    }

    /// Start playing `source`, tearing down any prior session first.
    ///
    /// Returns immediately; completion is signalled through the event bus
    /// as `Preparing`/`Active` state changes or a `Failed` event.
    pub async fn load(&self, source: impl Into<PathBuf>) {
        let source = source.into();
        info!(source = %source.display(), "Loading playback session");

        self.teardown_current().await;
        {
            let mut slot = self.inner.slot.lock().await;
            slot.current = Some(PlaybackSession::new(source.clone()));
        }

        let this = self.clone();
        tokio::spawn(async move {
            this.run_pipeline(source, false).await;
        });
    }

    /// Stop playback and return to `Idle`.
    pub async fn stop(&self) {
        self.teardown_current().await;
        self.emit(PlaybackEvent::StateChanged {
            state: BackendState::Idle,
        });
    }

    /// Restart the completed stream from zero.
    pub async fn replay(&self) {
        let source = {
            let mut slot = self.inner.slot.lock().await;
            let Some(session) = slot.current.as_mut() else {
                return;
            };
            if session.state != BackendState::Completed {
                return;
            }
            if let Some(countdown) = session.countdown_task.take() {
                countdown.abort();
            }
            session.awaiting_replay = false;
            session.state = BackendState::Active;
            session.last_persisted = None;
            session.source.clone()
        };

        debug!(source = %source.display(), "Replaying from the top");
        if self.inner.renderer.seek(Duration::ZERO).await.is_err() {
            self.handle_renderer_failure(source, "replay seek failed".to_string())
                .await;
            return;
        }
        self.emit(PlaybackEvent::StateChanged {
            state: BackendState::Active,
        });
    }

    /// Dismiss the replay countdown; the session stays `Completed`.
    pub async fn cancel_replay(&self) {
        let mut slot = self.inner.slot.lock().await;
        if let Some(session) = slot.current.as_mut() {
            if let Some(countdown) = session.countdown_task.take() {
                countdown.abort();
            }
            session.awaiting_replay = false;
        }
    }

    // ========================================================================
    // Pipeline
    // ========================================================================

    fn run_pipeline(
        &self,
        source: PathBuf,
        forced_transcode: bool,
    ) -> Pin<Box<dyn Future<Output = ()> + Send + '_>> {
        Box::pin(async move {
            let token = match self.inner.access.acquire(&source) {
                Ok(token) => token,
                Err(e) => {
                    self.fail_session(&source, format!("cannot open {}: {}", source.display(), e))
                        .await;
                    return;
                }
            };

            let resume = self.inner.resume.resume_for(&source).await;
            let plan = if forced_transcode {
                self.inner.planner.forced_transcode_plan(&source).await
            } else {
                self.inner.planner.plan(&source).await
            };

            {
                let mut slot = self.inner.slot.lock().await;
                let Some(session) = slot.for_source_mut(&source) else {
                    // Superseded while planning; the token releases on drop.
                    return;
                };
                session.access_token = Some(token);
                session.pending_resume = resume;
                session.plan = Some(plan.clone());
            }

            info!(plan = plan.kind(), source = %source.display(), "Playback plan ready");

            match plan {
                PlaybackPlan::Direct(path) => {
                    let url = format!("file://{}", path.display());
                    self.attach_renderer(source, url).await;
                }
                PlaybackPlan::Remux(request) => {
                    self.run_processing(source, ProcessingRequest::Remux(request))
                        .await;
                }
                PlaybackPlan::Transcode(request) => {
                    self.run_processing(source, ProcessingRequest::Transcode(request))
                        .await;
                }
            }
        })
    }

    async fn run_processing(&self, source: PathBuf, request: ProcessingRequest) {
        if !self.update_state(&source, BackendState::Preparing).await {
            return;
        }
        self.emit_processing(ProcessingEvent::Started {
            source: source.display().to_string(),
        });

        let PreparedStream { task, artifact } = self.inner.processor.prepare_stream(request);
        {
            let mut slot = self.inner.slot.lock().await;
            match slot.for_source_mut(&source) {
                Some(session) => session.task = Some(task.clone()),
                None => {
                    // Superseded before the job even registered.
                    task.cancel();
                    return;
                }
            }
        }

        let result = match artifact.await {
            Ok(result) => result,
            Err(_) => Err(ProcessingError::Cancelled),
        };

        match result {
            Ok(artifact) => self.publish_artifact(source, artifact).await,
            Err(ProcessingError::Cancelled) => {
                debug!(source = %source.display(), "Processing cancelled");
            }
            Err(e) => {
                if self.is_current(&source).await {
                    self.emit_processing(ProcessingEvent::Failed {
                        source: source.display().to_string(),
                        message: e.to_string(),
                    });
                    self.fail_session(&source, e.to_string()).await;
                }
            }
        }
    }

    async fn publish_artifact(&self, source: PathBuf, artifact: ProcessingArtifact) {
        let registration = match artifact.kind() {
            ArtifactKind::File(path) => self.inner.server.register_file(path.clone()).await,
            ArtifactKind::Hls {
                directory,
                playlist,
            } => {
                self.inner
                    .server
                    .register_hls(directory.clone(), playlist.clone())
                    .await
            }
        };

        let handle = match registration {
            Ok(handle) => handle,
            Err(e) => {
                artifact.cleanup();
                self.fail_session(&source, e.to_string()).await;
                return;
            }
        };

        let stream_url = handle.url().to_string();
        {
            let mut slot = self.inner.slot.lock().await;
            let Some(session) = slot.for_source_mut(&source) else {
                // Superseded while registering; release what we produced.
                handle.cleanup();
                artifact.cleanup();
                return;
            };
            session.task = None;
            session.artifact = Some(artifact);
            session.http_handle = Some(handle);
        }

        self.emit_processing(ProcessingEvent::Ready {
            source: source.display().to_string(),
        });
        self.attach_renderer(source, stream_url).await;
    }

    async fn attach_renderer(&self, source: PathBuf, stream_url: String) {
        let (sink, receiver) = mpsc::unbounded_channel();

        match self
            .inner
            .renderer
            .attach(RenderRequest::new(stream_url.clone()), sink)
            .await
        {
            Ok(_) => {}
            Err(e) => {
                self.handle_renderer_failure(source, e.to_string()).await;
                return;
            }
        }

        let pump = {
            let this = self.clone();
            let pump_source = source.clone();
            tokio::spawn(async move {
                this.pump_renderer_events(pump_source, receiver).await;
            })
        };

        {
            let mut slot = self.inner.slot.lock().await;
            let Some(session) = slot.for_source_mut(&source) else {
                pump.abort();
                self.inner.renderer.detach().await;
                return;
            };
            session.renderer_attached = true;
            session.pump_task = Some(pump);
            session.state = BackendState::Active;
        }

        debug!(url = %stream_url, "Renderer attached");
        self.emit(PlaybackEvent::StateChanged {
            state: BackendState::Active,
        });
    }

    // ========================================================================
    // Renderer callbacks
    // ========================================================================

    async fn pump_renderer_events(
        &self,
        source: PathBuf,
        mut receiver: mpsc::UnboundedReceiver<RendererEvent>,
    ) {
        while let Some(event) = receiver.recv().await {
            // Stale callbacks for a superseded source are dropped.
            if !self.is_current(&source).await {
                break;
            }
            match event {
                RendererEvent::ReadyToPlay => self.on_renderer_ready(&source).await,
                RendererEvent::TimeChanged { seconds } => self.on_time_changed(&source, seconds).await,
                RendererEvent::PlaybackEnded => self.on_playback_ended(&source).await,
                RendererEvent::Failed { message } => {
                    self.handle_renderer_failure(source.clone(), message).await;
                }
            }
        }
    }

    async fn on_renderer_ready(&self, source: &Path) {
        let seek_to = {
            let mut slot = self.inner.slot.lock().await;
            let Some(session) = slot.for_source_mut(source) else {
                return;
            };
            // Only plans that hand the renderer the original URL keep its
            // timeline; processed streams start from zero.
            let direct = matches!(session.plan, Some(PlaybackPlan::Direct(_)));
            match session.pending_resume.take() {
                Some(offset) if direct && offset > 0.0 => Some(offset),
                _ => None,
            }
        };

        if let Some(offset) = seek_to {
            debug!(offset, "Seeking to stored resume offset");
            if let Err(e) = self.inner.renderer.seek(Duration::from_secs_f64(offset)).await {
                warn!(error = %e, "Resume seek failed");
            }
        }
    }

    async fn on_time_changed(&self, source: &Path, seconds: f64) {
        self.emit(PlaybackEvent::Progress { seconds });

        let should_persist = {
            let mut slot = self.inner.slot.lock().await;
            let Some(session) = slot.for_source_mut(source) else {
                return;
            };
            match session.last_persisted {
                Some(last) if (seconds - last).abs() < PERSIST_DELTA_SECONDS => false,
                _ => {
                    session.last_persisted = Some(seconds);
                    true
                }
            }
        };

        if should_persist {
            if let Err(e) = self.inner.resume.record_position(source, seconds).await {
                warn!(error = %e, "Failed to persist playback position");
            }
        }
    }

    async fn on_playback_ended(&self, source: &Path) {
        {
            let mut slot = self.inner.slot.lock().await;
            let Some(session) = slot.for_source_mut(source) else {
                return;
            };
            session.state = BackendState::Completed;
            session.awaiting_replay = true;

            let this = self.clone();
            let countdown_source = source.to_path_buf();
            session.countdown_task = Some(tokio::spawn(async move {
                this.run_replay_countdown(countdown_source).await;
            }));
        }

        self.emit(PlaybackEvent::StateChanged {
            state: BackendState::Completed,
        });
    }

    async fn run_replay_countdown(&self, source: PathBuf) {
        for remaining in (1..=REPLAY_COUNTDOWN_SECONDS).rev() {
            self.emit(PlaybackEvent::ReplayCountdown {
                remaining_seconds: remaining,
            });
            tokio::time::sleep(Duration::from_secs(1)).await;
        }

        let still_waiting = {
            let mut slot = self.inner.slot.lock().await;
            match slot.for_source_mut(&source) {
                Some(session)
                    if session.awaiting_replay && session.state == BackendState::Completed =>
                {
                    // Drop our own handle so replay's abort cannot cancel
                    // this task mid-seek.
                    session.countdown_task = None;
                    true
                }
                _ => false,
            }
        };
        if still_waiting {
            self.replay().await;
        }
    }

    // ========================================================================
    // Failure handling
    // ========================================================================

    async fn handle_renderer_failure(&self, source: PathBuf, message: String) {
        let escalate = {
            let mut slot = self.inner.slot.lock().await;
            let Some(session) = slot.for_source_mut(&source) else {
                return;
            };
            let retryable = matches!(
                session.plan,
                Some(PlaybackPlan::Direct(_)) | Some(PlaybackPlan::Remux(_))
            );
            if retryable && !session.has_escalated {
                session.has_escalated = true;
                true
            } else {
                false
            }
        };

        if !escalate {
            self.fail_session(&source, message).await;
            return;
        }

        warn!(
            source = %source.display(),
            reason = %message,
            "Renderer rejected the stream; escalating to forced transcode"
        );
        self.release_session_resources(&source).await;

        let this = self.clone();
        tokio::spawn(async move {
            this.run_pipeline(source, true).await;
        });
    }

    async fn fail_session(&self, source: &Path, message: String) {
        if !self.is_current(source).await {
            return;
        }
        warn!(source = %source.display(), message = %message, "Playback failed");

        self.teardown_current().await;
        self.emit(PlaybackEvent::Failed { message });
        self.emit(PlaybackEvent::StateChanged {
            state: BackendState::Idle,
        });
    }

    // ========================================================================
    // Teardown
    // ========================================================================

    /// Release session resources in reverse order of acquisition but keep
    /// the session record (used when escalating in place).
    async fn release_session_resources(&self, source: &Path) {
        let resources = {
            let mut slot = self.inner.slot.lock().await;
            let Some(session) = slot.for_source_mut(source) else {
                return;
            };
            if let Some(countdown) = session.countdown_task.take() {
                countdown.abort();
            }
            let attached = std::mem::take(&mut session.renderer_attached);
            session.state = BackendState::Idle;
            session.awaiting_replay = false;
            (
                attached,
                session.pump_task.take(),
                session.task.take(),
                session.http_handle.take(),
                session.artifact.take(),
                session.access_token.take(),
            )
        };
        release_resources(&self.inner.renderer, resources).await;
    }

    /// Tear down the whole current session, if any.
    async fn teardown_current(&self) {
        let session = { self.inner.slot.lock().await.current.take() };
        let Some(mut session) = session else {
            return;
        };

        debug!(source = %session.source.display(), "Tearing down playback session");
        if let Some(countdown) = session.countdown_task.take() {
            countdown.abort();
        }
        release_resources(
            &self.inner.renderer,
            (
                session.renderer_attached,
                session.pump_task.take(),
                session.task.take(),
                session.http_handle.take(),
                session.artifact.take(),
                session.access_token.take(),
            ),
        )
        .await;
    }

    // ========================================================================
    // Helpers
    // ========================================================================

    async fn is_current(&self, source: &Path) -> bool {
        self.inner.slot.lock().await.for_source(source).is_some()
    }

    async fn update_state(&self, source: &Path, state: BackendState) -> bool {
        {
            let mut slot = self.inner.slot.lock().await;
            let Some(session) = slot.for_source_mut(source) else {
                return false;
            };
            session.state = state;
        }
        self.emit(PlaybackEvent::StateChanged { state });
        true
    }

    fn emit(&self, event: PlaybackEvent) {
        let _ = self.inner.events.emit(CoreEvent::Playback(event));
    }

    fn emit_processing(&self, event: ProcessingEvent) {
        let _ = self.inner.events.emit(CoreEvent::Processing(event));
    }
}

type SessionResources = (
    bool,
    Option<JoinHandle<()>>,
    Option<ProcessingTask>,
    Option<StreamHandle>,
    Option<ProcessingArtifact>,
    Option<SourceToken>,
);

/// Release in the fixed order: renderer, pump, processing task, HTTP handle,
/// artifact, source token.
async fn release_resources(renderer: &Arc<dyn VideoRenderer>, resources: SessionResources) {
    let (attached, pump, task, http_handle, artifact, token) = resources;

    if attached {
        renderer.detach().await;
    }
    if let Some(pump) = pump {
        pump.abort();
    }
    if let Some(task) = task {
        task.cancel();
    }
    if let Some(handle) = http_handle {
        handle.cleanup();
    }
    if let Some(artifact) = artifact {
        artifact.cleanup();
    }
    if let Some(mut token) = token {
        token.release();
    }
}
