//! `pathsmith serve`: the learning-path workflow as a JSON HTTP API.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post, put};
use axum::{Json, Router};
use serde::Deserialize;
use tower_http::cors::CorsLayer;
use uuid::Uuid;

use pathsmith_core::generate::{PathGenerator, create_learning_path};
use pathsmith_core::persistence::{PersistenceError, PersistenceGateway, PgPlanStore};
use pathsmith_core::state::{PlanController, StatusStore};
use pathsmith_core::{LearningGoalInput, Session};
use pathsmith_db::models::{LearningPath, ModuleStatus};

/// Header naming the signed-in user.
pub const USER_HEADER: &str = "x-user-id";

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

pub struct AppError {
    status: StatusCode,
    message: String,
    setup_required: bool,
}

impl AppError {
    fn new(status: StatusCode, msg: impl Into<String>) -> Self {
        Self {
            status,
            message: msg.into(),
            setup_required: false,
        }
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, msg)
    }

    pub fn unauthorized(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, msg)
    }
}

impl From<PersistenceError> for AppError {
    fn from(err: PersistenceError) -> Self {
        if err.is_setup_required() {
            return Self {
                status: StatusCode::SERVICE_UNAVAILABLE,
                message: err.to_string(),
                setup_required: true,
            };
        }
        tracing::error!(error = %err, "persistence failure");
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, err.to_string())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = if self.setup_required {
            serde_json::json!({ "error": self.message, "setup_required": true })
        } else {
            serde_json::json!({ "error": self.message })
        };
        (self.status, Json(body)).into_response()
    }
}

// ---------------------------------------------------------------------------
// State
// ---------------------------------------------------------------------------

#[derive(Clone)]
pub struct AppState {
    generator: Arc<PathGenerator>,
    gateway: Arc<PersistenceGateway<PgPlanStore>>,
    mirror: Arc<dyn StatusStore>,
}

impl AppState {
    pub fn new(
        generator: PathGenerator,
        gateway: PersistenceGateway<PgPlanStore>,
        mirror: Arc<dyn StatusStore>,
    ) -> Self {
        Self {
            generator: Arc::new(generator),
            gateway: Arc::new(gateway),
            mirror,
        }
    }

    /// A controller for one request, sharing the status mirror.
    fn controller(&self) -> PlanController<Arc<dyn StatusStore>> {
        PlanController::new(Arc::clone(&self.mirror))
    }
}

fn session_from(headers: &HeaderMap) -> Result<Session, AppError> {
    let raw = headers
        .get(USER_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| AppError::unauthorized(format!("missing {USER_HEADER} header")))?;
    Session::start(raw).map_err(|e| AppError::unauthorized(e.to_string()))
}

// ---------------------------------------------------------------------------
// Router
// ---------------------------------------------------------------------------

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/paths/generate", post(generate_path))
        .route("/api/paths", get(list_paths).post(save_path))
        .route("/api/paths/{id}", get(get_path).delete(delete_path))
        .route(
            "/api/paths/{id}/modules/{module_id}/status",
            put(set_module_status),
        )
        .fallback(not_found)
        .layer(CorsLayer::permissive())
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

pub async fn run_serve(state: AppState, bind: &str, port: u16) -> Result<()> {
    let app = build_router(state);
    let addr: SocketAddr = format!("{bind}:{port}").parse()?;
    tracing::info!("pathsmith serve listening on http://{addr}");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    tracing::info!("pathsmith serve shut down");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to install Ctrl+C handler");
        std::future::pending::<()>().await;
    }
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

async fn not_found() -> AppError {
    AppError::not_found("no such route")
}

async fn generate_path(
    State(state): State<AppState>,
    Json(input): Json<LearningGoalInput>,
) -> Response {
    let generated = create_learning_path(&state.generator, &input).await;
    Json(generated).into_response()
}

async fn list_paths(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Response, AppError> {
    let session = session_from(&headers)?;
    let paths = state.gateway.list_by_user(&session).await?;
    Ok(Json(paths).into_response())
}

async fn save_path(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(path): Json<LearningPath>,
) -> Result<Response, AppError> {
    let session = session_from(&headers)?;
    let stored = state.gateway.save(&path, &session).await?;

    let mut controller = state.controller();
    controller.open(path, false);
    controller.mark_saved(&stored);

    Ok((StatusCode::CREATED, Json(stored)).into_response())
}

/// Fetch one of the session user's saved paths with its mirrored statuses
/// applied. Paths owned by other users are reported as not found.
async fn load_active(
    state: &AppState,
    session: &Session,
    id: Uuid,
) -> Result<PlanController<Arc<dyn StatusStore>>, AppError> {
    let path = state
        .gateway
        .get(id, session)
        .await?
        .ok_or_else(|| AppError::not_found(format!("learning path {id} not found")))?;
    let mut controller = state.controller();
    controller.open(path, true);
    Ok(controller)
}

fn active_path(controller: &PlanController<Arc<dyn StatusStore>>) -> Option<&LearningPath> {
    controller.active().map(|a| &a.path)
}

async fn get_path(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
) -> Result<Response, AppError> {
    let session = session_from(&headers)?;
    let controller = load_active(&state, &session, id).await?;
    Ok(Json(active_path(&controller)).into_response())
}

#[derive(Debug, Deserialize)]
struct StatusUpdate {
    status: ModuleStatus,
}

async fn set_module_status(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path((id, module_id)): Path<(Uuid, String)>,
    Json(update): Json<StatusUpdate>,
) -> Result<Response, AppError> {
    let session = session_from(&headers)?;
    let mut controller = load_active(&state, &session, id).await?;
    if !controller.set_status(&module_id, update.status) {
        return Err(AppError::not_found(format!(
            "module {module_id} not found in learning path {id}"
        )));
    }
    Ok(Json(active_path(&controller)).into_response())
}

async fn delete_path(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
) -> Result<Response, AppError> {
    let session = session_from(&headers)?;
    if !state.gateway.delete(id, &session).await? {
        return Err(AppError::not_found(format!("learning path {id} not found")));
    }
    state.controller().forget(id);
    Ok(StatusCode::NO_CONTENT.into_response())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
