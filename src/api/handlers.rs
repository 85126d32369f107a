//! HTTP request handlers

use super::assets::{serve_index, serve_static};
use super::types::{
    ChatRequest, ChatResponse, ErrorResponse, IntentsResponse, RegisterIntentResponse,
};
use super::AppState;
use crate::db::Record;
use crate::intent::{IntentDefinition, IntentEntry};
use crate::session::Session;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};

/// Create the API router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Chat page
        .route("/", get(serve_index))
        .route("/static/*path", get(serve_static))
        // Turn endpoint, under the original path and the API prefix
        .route("/get_response", post(chat))
        .route("/api/chat", post(chat))
        // Sessions
        .route("/api/sessions/:id", get(get_session))
        .route("/api/sessions/:id/reset", post(reset_session))
        // Intent catalog
        .route("/api/intents", get(list_intents).post(register_intent))
        .route("/api/intents/:tag", get(get_intent))
        // Appended records
        .route("/api/records/:table", get(list_records))
        // Version
        .route("/version", get(get_version))
        .with_state(state)
}

// ============================================================
// Turns
// ============================================================

async fn chat(
    State(state): State<AppState>,
    Json(req): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, AppError> {
    let outcome = state
        .engine
        .handle_turn(&req.message, req.session_id.as_deref())
        .await
        .map_err(|e| AppError::Internal(e.to_string()))?;

    Ok(Json(outcome.into()))
}

// ============================================================
// Sessions
// ============================================================

async fn get_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Session>, AppError> {
    state
        .engine
        .session(&id)
        .await
        .map_err(|e| AppError::Internal(e.to_string()))?
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("Session not found: {id}")))
}

async fn reset_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Session>, AppError> {
    state
        .engine
        .reset_session(&id)
        .await
        .map_err(|e| AppError::Internal(e.to_string()))?
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("Session not found: {id}")))
}

// ============================================================
// Intent catalog
// ============================================================

async fn list_intents(State(state): State<AppState>) -> Json<IntentsResponse> {
    Json(IntentsResponse {
        intents: state.engine.intent_tags(),
    })
}

async fn register_intent(
    State(state): State<AppState>,
    Json(entry): Json<IntentEntry>,
) -> Result<Json<RegisterIntentResponse>, AppError> {
    let definition =
        IntentDefinition::try_from(entry).map_err(|e| AppError::BadRequest(e.to_string()))?;
    let tag = definition.tag.clone();
    state.engine.register_intent(definition);

    Ok(Json(RegisterIntentResponse {
        tag,
        total: state.engine.intent_tags().len(),
    }))
}

async fn get_intent(
    State(state): State<AppState>,
    Path(tag): Path<String>,
) -> Result<Json<IntentEntry>, AppError> {
    state
        .engine
        .intent(&tag)
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("Intent not found: {tag}")))
}

// ============================================================
// Records
// ============================================================

async fn list_records(
    State(state): State<AppState>,
    Path(table): Path<String>,
) -> Result<Json<Vec<Record>>, AppError> {
    let records = state
        .db
        .call(move |db| db.list_records(&table))
        .await
        .map_err(|e| AppError::Internal(e.to_string()))?;
    Ok(Json(records))
}

async fn get_version() -> &'static str {
    concat!("care-intake ", env!("CARGO_PKG_VERSION"))
}

// ============================================================
// Error Handling
// ============================================================

enum AppError {
    BadRequest(String),
    NotFound(String),
    Internal(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::Internal(msg) => {
                tracing::error!(error = %msg, "Request failed");
                (StatusCode::INTERNAL_SERVER_ERROR, msg)
            }
        };

        let body = Json(ErrorResponse::new(message));
        (status, body).into_response()
    }
}
