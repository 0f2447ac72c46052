//! HTTP Endpoints
//!
//! REST API for the medical chatbot.

use axum::{
    extract::{Json, Path, State},
    http::{HeaderValue, Method, StatusCode},
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::{Any, CorsLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use medbot_agent::TransitionOutcome;
use medbot_core::DialogueState;

use crate::metrics::{metrics_handler, record_request};
use crate::session::{Session, SessionSnapshot};
use crate::state::AppState;
use crate::ServerError;

const FALLBACK_ORIGIN: &str = "http://localhost:3000";

/// Create the application router
pub fn create_router(state: AppState) -> Router {
    let server = &state.config.server;
    let cors_layer = build_cors_layer(&server.cors_origins, server.cors_enabled);
    let timeout = Duration::from_secs(server.timeout_seconds);

    Router::new()
        // Session endpoints
        .route("/api/sessions", post(create_session).get(list_sessions))
        .route("/api/sessions/:id", get(get_session).delete(delete_session))
        .route("/api/sessions/:id/end", post(end_session))
        // Chat endpoint
        .route("/api/chat/:session_id", post(chat))
        // Health check
        .route("/health", get(health_check))
        // Prometheus metrics
        .route("/metrics", get(metrics_handler))
        .layer(TimeoutLayer::new(timeout))
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer)
        .with_state(state)
}

/// Build CORS layer from configured origins
///
/// - If cors_enabled is false, returns permissive layer (for dev)
/// - If cors_origins is empty or all invalid, falls back to localhost:3000
/// - Otherwise, uses the configured origins
fn build_cors_layer(origins: &[String], enabled: bool) -> CorsLayer {
    if !enabled {
        tracing::warn!("CORS is disabled - allowing all origins (NOT FOR PRODUCTION)");
        return CorsLayer::permissive();
    }

    let parsed_origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| {
            origin.parse::<HeaderValue>().ok().or_else(|| {
                tracing::warn!("Invalid CORS origin: {}", origin);
                None
            })
        })
        .collect();

    if parsed_origins.is_empty() {
        tracing::info!("No usable CORS origins configured, defaulting to {}", FALLBACK_ORIGIN);
        return CorsLayer::new()
            .allow_origin(HeaderValue::from_static(FALLBACK_ORIGIN))
            .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
            .allow_headers(Any);
    }

    tracing::info!("CORS configured with {} origins", parsed_origins.len());
    CorsLayer::new()
        .allow_origin(parsed_origins)
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .allow_headers(Any)
}

fn reject(err: ServerError) -> StatusCode {
    match &err {
        ServerError::Internal(_) => tracing::error!(error = %err, "Request failed"),
        _ => tracing::debug!(error = %err, "Request rejected"),
    }
    StatusCode::from(err)
}

/// Session creation response
#[derive(Debug, Serialize)]
struct CreatedSession {
    session_id: String,
    state: DialogueState,
}

/// Create a session in the Start state
async fn create_session(
    State(state): State<AppState>,
) -> Result<(StatusCode, Json<CreatedSession>), StatusCode> {
    record_request("create_session");
    let session = state.sessions.create().map_err(reject)?;

    Ok((
        StatusCode::CREATED,
        Json(CreatedSession {
            session_id: session.id.clone(),
            state: session.state(),
        }),
    ))
}

/// Get session info
async fn get_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<SessionSnapshot>, StatusCode> {
    record_request("get_session");
    let session = state.sessions.get(&id).ok_or(StatusCode::NOT_FOUND)?;
    Ok(Json(session.snapshot()))
}

/// Delete session
async fn delete_session(State(state): State<AppState>, Path(id): Path<String>) -> StatusCode {
    record_request("delete_session");
    state.sessions.remove(&id);
    StatusCode::NO_CONTENT
}

/// List sessions
async fn list_sessions(State(state): State<AppState>) -> Json<serde_json::Value> {
    record_request("list_sessions");
    let sessions = state.sessions.list();
    Json(serde_json::json!({
        "sessions": sessions,
        "count": sessions.len(),
    }))
}

/// Chat request
#[derive(Debug, Deserialize)]
struct ChatRequest {
    message: String,
}

/// Chat response
#[derive(Debug, Serialize)]
struct ChatResponse {
    session_id: String,
    reply: String,
    #[serde(flatten)]
    outcome: TransitionOutcome,
}

impl ChatResponse {
    fn new(session_id: String, outcome: TransitionOutcome) -> Self {
        Self {
            session_id,
            reply: outcome.reply(),
            outcome,
        }
    }
}

/// Run blocking machine work off the async executor
async fn run_on_session<F>(session: Arc<Session>, work: F) -> Result<TransitionOutcome, ServerError>
where
    F: FnOnce(&Session) -> TransitionOutcome + Send + 'static,
{
    tokio::task::spawn_blocking(move || work(&session))
        .await
        .map_err(|e| ServerError::Internal(format!("Dialogue task failed: {}", e)))
}

/// Chat endpoint
///
/// Unknown session ids get a fresh session on first contact.
async fn chat(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
    Json(request): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, StatusCode> {
    record_request("chat");
    let session = state.sessions.get_or_create(&session_id).map_err(reject)?;

    let message = request.message;
    let outcome = run_on_session(session, move |s| s.transition(&message))
        .await
        .map_err(reject)?;

    Ok(Json(ChatResponse::new(session_id, outcome)))
}

/// End the conversation
async fn end_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ChatResponse>, StatusCode> {
    record_request("end_session");
    let session = state.sessions.get(&id).ok_or(StatusCode::NOT_FOUND)?;

    let outcome = run_on_session(session, |s| s.end()).await.map_err(reject)?;

    tracing::info!(session_id = %id, "Conversation ended");
    Ok(Json(ChatResponse::new(id, outcome)))
}

/// Liveness check
async fn health_check(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "healthy",
        "version": env!("CARGO_PKG_VERSION"),
        "environment": state.config.environment,
        "sessions": state.sessions.count(),
    }))
}
