//! HTTP API over panel sessions.
//!
//! Each session owns one [`PanelController`]. Requests against the same
//! session are serialized by its lock, so a save cannot interleave with an
//! edit of the same session. Sessions untouched for longer than the idle
//! timeout are dropped; the next request on them gets `session_not_found`.

use std::collections::HashMap;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, patch, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::{Mutex, RwLock};
use tokio::time::Instant;
use tracing::{debug, info, instrument};

use crate::backend::{ActionReport, PanelBackend, Variant};
use crate::controller::{PanelController, PanelView, SaveReport};
use crate::error::{PanelError, Result};
use crate::store::validate_user_id;

pub const DEFAULT_SESSION_IDLE_TIMEOUT: Duration = Duration::from_secs(30 * 60);

type Session<B> = Arc<Mutex<PanelController<B>>>;

struct SessionEntry<B> {
    controller: Session<B>,
    /// Milliseconds after `AppState::start_time` of the last request.
    last_used_ms: AtomicU64,
}

pub struct AppState<B> {
    backend: Arc<B>,
    sessions: Arc<RwLock<HashMap<String, Arc<SessionEntry<B>>>>>,
    default_user_id: Option<String>,
    idle_timeout: Duration,
    start_time: Instant,
}

impl<B> Clone for AppState<B> {
    fn clone(&self) -> Self {
        Self {
            backend: Arc::clone(&self.backend),
            sessions: Arc::clone(&self.sessions),
            default_user_id: self.default_user_id.clone(),
            idle_timeout: self.idle_timeout,
            start_time: self.start_time,
        }
    }
}

impl<B: PanelBackend> AppState<B> {
    /// `default_user_id` is used when a new session does not name one.
    pub fn new(backend: B, default_user_id: Option<String>) -> Self {
        Self {
            backend: Arc::new(backend),
            sessions: Arc::new(RwLock::new(HashMap::new())),
            default_user_id,
            idle_timeout: DEFAULT_SESSION_IDLE_TIMEOUT,
            start_time: Instant::now(),
        }
    }

    pub fn with_idle_timeout(mut self, idle_timeout: Duration) -> Self {
        self.idle_timeout = idle_timeout;
        self
    }

    pub fn variant(&self) -> Variant {
        self.backend.variant()
    }

    fn now_ms(&self) -> u64 {
        u64::try_from(self.start_time.elapsed().as_millis()).unwrap_or(u64::MAX)
    }

    fn is_idle(&self, entry: &SessionEntry<B>, now_ms: u64) -> bool {
        let idle = now_ms.saturating_sub(entry.last_used_ms.load(Ordering::Relaxed));
        Duration::from_millis(idle) > self.idle_timeout
    }

    async fn session(&self, id: &str) -> Result<Session<B>> {
        let now_ms = self.now_ms();
        let entry = self
            .sessions
            .read()
            .await
            .get(id)
            .cloned()
            .ok_or_else(|| PanelError::SessionNotFound(id.to_string()))?;

        if self.is_idle(&entry, now_ms) {
            self.sessions.write().await.remove(id);
            debug!(session = id, "Idle session dropped");
            return Err(PanelError::SessionNotFound(id.to_string()));
        }
        entry.last_used_ms.fetch_max(now_ms, Ordering::Relaxed);
        Ok(Arc::clone(&entry.controller))
    }

    /// Opening a session also sweeps out idle ones.
    async fn insert(&self, id: String, controller: PanelController<B>) {
        let now_ms = self.now_ms();
        let mut sessions = self.sessions.write().await;
        let dropped = self.sweep(&mut sessions, now_ms);
        if dropped > 0 {
            info!(dropped, "Idle sessions dropped");
        }
        sessions.insert(
            id,
            Arc::new(SessionEntry {
                controller: Arc::new(Mutex::new(controller)),
                last_used_ms: AtomicU64::new(now_ms),
            }),
        );
    }

    /// Drop every session idle past the timeout. Returns how many went.
    pub async fn evict_idle(&self) -> usize {
        let now_ms = self.now_ms();
        let mut sessions = self.sessions.write().await;
        self.sweep(&mut sessions, now_ms)
    }

    fn sweep(&self, sessions: &mut HashMap<String, Arc<SessionEntry<B>>>, now_ms: u64) -> usize {
        let before = sessions.len();
        sessions.retain(|_, entry| !self.is_idle(entry, now_ms));
        before - sessions.len()
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthStatus {
    pub status: String,
    pub variant: String,
    pub sessions: usize,
    pub uptime_secs: u64,
}

#[derive(Debug, Default, Deserialize)]
struct CreateSession {
    #[serde(default)]
    user_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FieldEdit {
    key: String,
    value: Value,
}

#[derive(Debug, Serialize)]
pub struct SessionView {
    pub id: String,
    #[serde(flatten)]
    pub view: PanelView,
}

#[derive(Debug, Serialize)]
struct SaveResponse {
    #[serde(flatten)]
    report: SaveReport,
    session: SessionView,
}

pub fn router<B: PanelBackend>(state: AppState<B>) -> Router {
    Router::new()
        .route("/health", get(health::<B>))
        .route("/api/sessions", post(create_session::<B>))
        .route(
            "/api/sessions/{id}",
            get(get_session::<B>).delete(close_session::<B>),
        )
        .route("/api/sessions/{id}/fields", patch(edit_field::<B>))
        .route("/api/sessions/{id}/save", post(save_session::<B>))
        .route("/api/sessions/{id}/reload", post(reload_session::<B>))
        .route("/api/sessions/{id}/actions/{name}", post(run_action::<B>))
        .with_state(state)
}

/// Bind `0.0.0.0:{port}` and serve until `shutdown` resolves.
pub async fn serve(
    app: Router,
    port: u16,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> std::io::Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(addr = %addr, "Panel listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await
}

async fn health<B: PanelBackend>(State(state): State<AppState<B>>) -> Json<HealthStatus> {
    state.evict_idle().await;
    Json(HealthStatus {
        status: "ok".to_string(),
        variant: state.backend.variant().as_str().to_string(),
        sessions: state.sessions.read().await.len(),
        uptime_secs: state.start_time.elapsed().as_secs(),
    })
}

/// A failed initial load still creates the session: it starts in `error`
/// with the reason attached, and `reload` retries.
#[instrument(name = "http.create_session", skip_all, fields(session = tracing::field::Empty))]
async fn create_session<B: PanelBackend>(
    State(state): State<AppState<B>>,
    body: Bytes,
) -> Result<(StatusCode, Json<SessionView>)> {
    let request: CreateSession = if body.is_empty() {
        CreateSession::default()
    } else {
        serde_json::from_slice(&body).map_err(|e| PanelError::parse("request body", e))?
    };
    let user_id = request
        .user_id
        .or_else(|| state.default_user_id.clone())
        .unwrap_or_default();
    validate_user_id(&user_id)?;

    let id = uuid::Uuid::new_v4().simple().to_string();
    tracing::Span::current().record("session", id.as_str());

    let mut controller = PanelController::new(Arc::clone(&state.backend), user_id);
    let _ = controller.load().await;
    let view = controller.view();

    state.insert(id.clone(), controller).await;
    info!(state = view.state.as_str(), "Session opened");

    Ok((StatusCode::CREATED, Json(SessionView { id, view })))
}

async fn get_session<B: PanelBackend>(
    State(state): State<AppState<B>>,
    Path(id): Path<String>,
) -> Result<Json<SessionView>> {
    let session = state.session(&id).await?;
    let view = session.lock().await.view();
    Ok(Json(SessionView { id, view }))
}

#[instrument(name = "http.edit_field", skip_all, fields(session = %id, key = %edit.key))]
async fn edit_field<B: PanelBackend>(
    State(state): State<AppState<B>>,
    Path(id): Path<String>,
    Json(edit): Json<FieldEdit>,
) -> Result<Json<SessionView>> {
    let session = state.session(&id).await?;
    let mut controller = session.lock().await;
    controller.edit(&edit.key, &edit.value)?;
    Ok(Json(SessionView {
        id,
        view: controller.view(),
    }))
}

#[instrument(name = "http.save", skip_all, fields(session = %id))]
async fn save_session<B: PanelBackend>(
    State(state): State<AppState<B>>,
    Path(id): Path<String>,
) -> Result<Json<SaveResponse>> {
    let session = state.session(&id).await?;
    let mut controller = session.lock().await;
    let report = controller.save().await?;
    Ok(Json(SaveResponse {
        report,
        session: SessionView {
            id,
            view: controller.view(),
        },
    }))
}

#[instrument(name = "http.reload", skip_all, fields(session = %id))]
async fn reload_session<B: PanelBackend>(
    State(state): State<AppState<B>>,
    Path(id): Path<String>,
) -> Result<Json<SessionView>> {
    let session = state.session(&id).await?;
    let mut controller = session.lock().await;
    controller.reload().await?;
    Ok(Json(SessionView {
        id,
        view: controller.view(),
    }))
}

#[instrument(name = "http.action", skip_all, fields(session = %id, action = %name))]
async fn run_action<B: PanelBackend>(
    State(state): State<AppState<B>>,
    Path((id, name)): Path<(String, String)>,
) -> Result<Json<ActionReport>> {
    let session = state.session(&id).await?;
    let report = session.lock().await.action(&name).await?;
    Ok(Json(report))
}

async fn close_session<B: PanelBackend>(
    State(state): State<AppState<B>>,
    Path(id): Path<String>,
) -> Result<StatusCode> {
    state
        .sessions
        .write()
        .await
        .remove(&id)
        .ok_or(PanelError::SessionNotFound(id))?;
    Ok(StatusCode::NO_CONTENT)
}
