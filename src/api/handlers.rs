//! HTTP request handlers

use super::assets::serve_index;
use super::sse::sse_stream;
use super::types::{
    ChatRequest, ChatResponse, ErrorResponse, ModelInfoResponse, SessionCreatedResponse,
    SuccessResponse, VerifyRequest, VerifyResponse,
};
use super::AppState;
use crate::llm::PROVIDER_NAME;
use crate::runtime::SessionError;
use crate::session::SessionSnapshot;
use crate::state_machine::Event;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};

const NOT_VERIFIED: &str = "API key not verified";

/// Create the API router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(serve_index))
        // Session lifecycle
        .route("/api/sessions", post(create_session))
        .route("/api/sessions/:id", get(get_session).delete(delete_session))
        // SSE streaming
        .route("/api/sessions/:id/stream", get(stream_session))
        // User actions
        .route("/api/sessions/:id/verify", post(verify_key))
        .route("/api/sessions/:id/chat", post(send_chat))
        .route("/api/sessions/:id/clear", post(clear_chat))
        .route(
            "/api/sessions/:id/reset-first-response",
            post(reset_first_response),
        )
        // Model info
        .route("/api/model", get(get_model))
        // Version
        .route("/version", get(get_version))
        .with_state(state)
}

// ============================================================
// Session Lifecycle
// ============================================================

async fn create_session(State(state): State<AppState>) -> Json<SessionCreatedResponse> {
    let (session_id, handle) = state.sessions.create().await;
    Json(SessionCreatedResponse {
        session_id,
        session: handle.snapshot(),
    })
}

async fn get_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<SessionSnapshot>, AppError> {
    let handle = state.sessions.get(&id).await?;
    Ok(Json(handle.snapshot()))
}

async fn delete_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<SuccessResponse>, AppError> {
    state.sessions.remove(&id).await?;
    Ok(Json(SuccessResponse { success: true }))
}

async fn stream_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let handle = state.sessions.get(&id).await?;
    // Subscribe first so nothing published after the snapshot is missed
    let broadcast_rx = handle.subscribe();
    Ok(sse_stream(handle.snapshot(), broadcast_rx))
}

// ============================================================
// User Actions
// ============================================================

async fn verify_key(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<VerifyRequest>,
) -> Result<Json<VerifyResponse>, AppError> {
    if req.api_key.trim().is_empty() {
        return Err(AppError::BadRequest("Please enter an API key.".to_string()));
    }

    let (verified, session) = state.sessions.verify_api_key(&id, &req.api_key).await?;
    Ok(Json(VerifyResponse { verified, session }))
}

async fn send_chat(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, AppError> {
    let handle = state.sessions.get(&id).await?;

    let current = handle.snapshot();
    if !current.api_key_verified {
        return Ok(Json(ChatResponse {
            accepted: false,
            reason: Some(NOT_VERIFIED.to_string()),
            session: current,
        }));
    }

    match handle.send(Event::submit(req.text)).await {
        Ok(session) => Ok(Json(ChatResponse {
            accepted: true,
            reason: None,
            session,
        })),
        Err(SessionError::Rejected(reason)) => Ok(Json(ChatResponse {
            accepted: false,
            reason: Some(reason.to_string()),
            session: handle.snapshot(),
        })),
        Err(e) => Err(e.into()),
    }
}

async fn clear_chat(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<SessionSnapshot>, AppError> {
    let session = state.sessions.send_event(&id, Event::clear_chat()).await?;
    Ok(Json(session))
}

async fn reset_first_response(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<SessionSnapshot>, AppError> {
    let session = state
        .sessions
        .send_event(&id, Event::ResetFirstResponse)
        .await?;
    Ok(Json(session))
}

// ============================================================
// Model Info
// ============================================================

async fn get_model(State(state): State<AppState>) -> Json<ModelInfoResponse> {
    Json(ModelInfoResponse {
        model: state.sessions.model_id().to_string(),
        provider: PROVIDER_NAME.to_string(),
    })
}

async fn get_version() -> &'static str {
    concat!("first-response-chat ", env!("CARGO_PKG_VERSION"))
}

// ============================================================
// Error Handling
// ============================================================

#[derive(Debug)]
enum AppError {
    BadRequest(String),
    NotFound(String),
    Internal(String),
}

impl From<SessionError> for AppError {
    fn from(e: SessionError) -> Self {
        match e {
            SessionError::NotFound(_) => AppError::NotFound(e.to_string()),
            SessionError::Rejected(_) => AppError::BadRequest(e.to_string()),
            SessionError::Stopped => AppError::Internal(e.to_string()),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };

        let body = Json(ErrorResponse::new(message));
        (status, body).into_response()
    }
}
