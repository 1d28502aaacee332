//! The loopback stream server.
//!
//! One process-wide listener serves every registered session. The listener
//! is bound lazily on first registration: the configured port is tried
//! first, and when it is already taken an ephemeral port is bound instead -
//! every returned URL embeds the port that actually got bound, so callers
//! never have to assume the bind succeeded.

use crate::error::{Result, ServerError};
use crate::range::{resolve_range, RangeOutcome};
use crate::session::{ServerState, SessionKind, SharedState, StreamHandle};
use axum::{
    body::Body,
    extract::{Path as RoutePath, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use parking_lot::Mutex;
use std::io::SeekFrom;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::io::{AsyncReadExt, AsyncSeekExt};
use tokio::net::TcpListener;
use tokio_util::io::ReaderStream;
use tracing::{debug, error, info};
use uuid::Uuid;

/// File bodies are streamed in chunks no larger than this.
const FILE_CHUNK_SIZE: usize = 1024 * 1024;

/// Shared loopback HTTP server for prepared streams.
///
/// Clones share the listener and session table; the whole process uses one
/// logical server.
#[derive(Clone)]
pub struct StreamServer {
    requested_port: u16,
    state: SharedState,
}

impl StreamServer {
    /// Create a server that will ask for `port` on first registration.
    pub fn new(port: u16) -> Self {
        Self {
            requested_port: port,
            state: Arc::new(Mutex::new(ServerState::default())),
        }
    }

    /// Register a single file for byte-range service.
    ///
    /// Returns a handle whose URL is immediately servable.
    pub async fn register_file(&self, path: impl Into<PathBuf>) -> Result<StreamHandle> {
        let port = self.ensure_started().await?;
        let id = Uuid::new_v4();
        let path = path.into();

        self.state
            .lock()
            .sessions
            .insert(id, SessionKind::File(path.clone()));

        let url = format!("http://127.0.0.1:{}/stream/{}", port, id);
        debug!(session = %id, file = %path.display(), "Registered file stream");
        Ok(StreamHandle::new(id, url, self.state.clone()))
    }

    /// Register an HLS directory; `playlist` must already exist inside it.
    pub async fn register_hls(
        &self,
        directory: impl Into<PathBuf>,
        playlist: impl Into<String>,
    ) -> Result<StreamHandle> {
        let directory = directory.into();
        let playlist = playlist.into();

        if !directory.join(&playlist).is_file() {
            return Err(ServerError::InvalidRequest(format!(
                "playlist {} not found in {}",
                playlist,
                directory.display()
            )));
        }

        let port = self.ensure_started().await?;
        let id = Uuid::new_v4();

        self.state.lock().sessions.insert(
            id,
            SessionKind::Hls {
                directory: directory.clone(),
                playlist: playlist.clone(),
            },
        );

        let url = format!("http://127.0.0.1:{}/hls/{}/{}", port, id, playlist);
        debug!(session = %id, dir = %directory.display(), "Registered HLS stream");
        Ok(StreamHandle::new(id, url, self.state.clone()))
    }

    /// Number of live sessions.
    pub fn active_sessions(&self) -> usize {
        self.state.lock().sessions.len()
    }

    /// Port the listener is bound to, once it exists.
    pub fn bound_port(&self) -> Option<u16> {
        self.state.lock().port
    }

    /// Bind the listener if this is the first registration.
    async fn ensure_started(&self) -> Result<u16> {
        if let Some(port) = self.state.lock().port {
            return Ok(port);
        }

        let listener = match TcpListener::bind(("127.0.0.1", self.requested_port)).await {
            Ok(listener) => listener,
            Err(first) => TcpListener::bind(("127.0.0.1", 0)).await.map_err(|e| {
                ServerError::ListenerUnavailable(format!(
                    "port {} ({}), ephemeral port ({})",
                    self.requested_port, first, e
                ))
            })?,
        };
        let port = listener.local_addr()?.port();

        {
            let mut state = self.state.lock();
            // A concurrent registration may have won the startup race; its
            // listener stays, ours is dropped.
            if let Some(existing) = state.port {
                return Ok(existing);
            }
            state.port = Some(port);
        }

        let router = build_router(self.state.clone());
        tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, router).await {
                error!(error = %e, "Stream server terminated");
            }
        });

        info!(port, "Stream server listening on loopback");
        Ok(port)
    }
}

fn build_router(state: SharedState) -> Router {
    Router::new()
        .route("/stream/{id}", get(stream_handler))
        .route("/hls/{id}", get(hls_root_handler))
        .route("/hls/{id}/{*rest}", get(hls_handler))
        .fallback(fallback_handler)
        .with_state(state)
}

// ============================================================================
// Handlers
// ============================================================================

async fn stream_handler(
    State(state): State<SharedState>,
    RoutePath(id): RoutePath<String>,
    headers: HeaderMap,
) -> Response {
    let Some(SessionKind::File(path)) = lookup(&state, &id) else {
        return error_response(StatusCode::NOT_FOUND, "unknown stream");
    };

    let range_header = headers
        .get(header::RANGE)
        .and_then(|value| value.to_str().ok());

    serve_file(&path, range_header).await
}

async fn hls_root_handler(
    State(state): State<SharedState>,
    RoutePath(id): RoutePath<String>,
) -> Response {
    let Some(SessionKind::Hls { directory, playlist }) = lookup(&state, &id) else {
        return error_response(StatusCode::NOT_FOUND, "unknown stream");
    };
    serve_hls_entry(&directory, &playlist).await
}

async fn hls_handler(
    State(state): State<SharedState>,
    RoutePath((id, rest)): RoutePath<(String, String)>,
) -> Response {
    let Some(SessionKind::Hls { directory, playlist }) = lookup(&state, &id) else {
        return error_response(StatusCode::NOT_FOUND, "unknown stream");
    };

    let relative = if rest.is_empty() { playlist } else { rest };
    serve_hls_entry(&directory, &relative).await
}

async fn fallback_handler() -> Response {
    error_response(StatusCode::NOT_FOUND, "not found")
}

fn lookup(state: &SharedState, id: &str) -> Option<SessionKind> {
    let id = Uuid::parse_str(id).ok()?;
    state.lock().sessions.get(&id).cloned()
}

// ============================================================================
// File service
// ============================================================================

async fn serve_file(path: &Path, range_header: Option<&str>) -> Response {
    let mut file = match tokio::fs::File::open(path).await {
        Ok(file) => file,
        Err(_) => return error_response(StatusCode::NOT_FOUND, "stream source missing"),
    };
    let size = match file.metadata().await {
        Ok(metadata) => metadata.len(),
        Err(_) => return error_response(StatusCode::INTERNAL_SERVER_ERROR, "stream source unreadable"),
    };

    let (status, start, length, content_range) = match resolve_range(range_header, size) {
        RangeOutcome::Unsatisfiable => {
            return error_response(
                StatusCode::RANGE_NOT_SATISFIABLE,
                "requested range not satisfiable",
            );
        }
        RangeOutcome::Full => (StatusCode::OK, 0, size, None),
        RangeOutcome::Partial { start, end } => (
            StatusCode::PARTIAL_CONTENT,
            start,
            end - start + 1,
            Some(format!("bytes {}-{}/{}", start, end, size)),
        ),
    };

    if start > 0 {
        if file.seek(SeekFrom::Start(start)).await.is_err() {
            return error_response(StatusCode::INTERNAL_SERVER_ERROR, "seek failed");
        }
    }

    let stream = ReaderStream::with_capacity(file.take(length), FILE_CHUNK_SIZE);

    let mut builder = Response::builder()
        .status(status)
        .header(header::CONTENT_TYPE, "video/mp4")
        .header(header::ACCEPT_RANGES, "bytes")
        .header(header::CONNECTION, "close")
        .header(header::CONTENT_LENGTH, length);
    if let Some(content_range) = content_range {
        builder = builder.header(header::CONTENT_RANGE, content_range);
    }

    match builder.body(Body::from_stream(stream)) {
        Ok(response) => response,
        Err(_) => error_response(StatusCode::INTERNAL_SERVER_ERROR, "response build failed"),
    }
}

// ============================================================================
// HLS service
// ============================================================================

async fn serve_hls_entry(directory: &Path, relative: &str) -> Response {
    // Path-traversal guard: drop `..` components, then require the resolved
    // file to live under the session's directory.
    let sanitized = sanitize_relative(relative);

    let Ok(canonical_dir) = tokio::fs::canonicalize(directory).await else {
        return error_response(StatusCode::NOT_FOUND, "stream directory missing");
    };
    let Ok(target) = tokio::fs::canonicalize(directory.join(&sanitized)).await else {
        return error_response(StatusCode::NOT_FOUND, "no such entry");
    };
    if !target.starts_with(&canonical_dir) {
        return error_response(StatusCode::NOT_FOUND, "no such entry");
    }

    let Ok(bytes) = tokio::fs::read(&target).await else {
        return error_response(StatusCode::NOT_FOUND, "no such entry");
    };

    let length = bytes.len();
    (
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, hls_content_type(&target).to_string()),
            (header::CONTENT_LENGTH, length.to_string()),
            (header::CONNECTION, "close".to_string()),
        ],
        Body::from(bytes),
    )
        .into_response()
}

/// Strip empty and `..` components from a request-relative path.
fn sanitize_relative(relative: &str) -> PathBuf {
    relative
        .split('/')
        .filter(|component| !component.is_empty() && *component != "..")
        .collect()
}

fn hls_content_type(path: &Path) -> &'static str {
    match path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase())
        .as_deref()
    {
        Some("m3u8") => "application/vnd.apple.mpegurl",
        Some("ts") => "video/mp2t",
        Some("mp4") | Some("m4s") => "video/mp4",
        _ => "application/octet-stream",
    }
}

fn error_response(status: StatusCode, message: &str) -> Response {
    (
        status,
        [
            (header::CONTENT_TYPE, "text/plain; charset=utf-8".to_string()),
            (header::CONNECTION, "close".to_string()),
        ],
        message.to_string(),
    )
        .into_response()
}
