//! HTTP request handlers

use super::types::{
    ChatRequest, ChatResponse, CreateWebCallRequest, CreateWebCallResponse, ErrorResponse,
    HistoryEntry,
};
use super::AppState;
use crate::llm::LlmRequest;
use crate::persona::{FALLBACK_REPLY, SYSTEM_INSTRUCTION};
use crate::transcript::ConversationTurn;
use crate::voice::VoiceError;
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use std::path::Path;
use tower_http::services::ServeDir;

/// Create the API router. Paths outside `/api` are served from `static_dir`.
pub fn create_router(state: AppState, static_dir: &Path) -> Router {
    Router::new()
        .route(
            "/api/create-web-call",
            post(create_web_call).fallback(method_not_allowed),
        )
        .route("/api/chat", post(chat).fallback(method_not_allowed))
        .fallback_service(ServeDir::new(static_dir))
        .with_state(state)
}

// ============================================================
// Voice credential
// ============================================================

async fn create_web_call(
    State(state): State<AppState>,
    payload: Option<Json<CreateWebCallRequest>>,
) -> Result<Json<CreateWebCallResponse>, AppError> {
    let request = payload.map(|Json(r)| r).unwrap_or_default();
    let agent_id = request
        .agent_id
        .filter(|id| !id.is_empty())
        .unwrap_or_else(|| state.default_agent_id.to_string());

    match state.voice.create_web_call(&agent_id).await {
        Ok(call) => Ok(Json(CreateWebCallResponse {
            access_token: call.access_token,
        })),
        Err(VoiceError::Upstream { status, body }) => Err(AppError::Upstream { status, body }),
        Err(e) => {
            tracing::error!(error = %e, "Failed to create web call");
            Err(AppError::Internal("Failed to create web call".to_string()))
        }
    }
}

// ============================================================
// Chat
// ============================================================

async fn chat(
    State(state): State<AppState>,
    payload: Option<Json<ChatRequest>>,
) -> Result<Json<ChatResponse>, AppError> {
    let message = payload
        .and_then(|Json(r)| r.message.filter(|m| !m.is_empty()).map(|m| (m, r.history)));
    let Some((message, history)) = message else {
        return Err(AppError::BadRequest("Message is required".to_string()));
    };

    let history: Vec<ConversationTurn> = history.iter().map(HistoryEntry::to_turn).collect();
    let request = LlmRequest::from_history(SYSTEM_INSTRUCTION, &history, message);

    match state.llm.complete(&request).await {
        Ok(response) => Ok(Json(ChatResponse {
            reply: response
                .text
                .unwrap_or_else(|| FALLBACK_REPLY.to_string()),
        })),
        Err(e) => match e.status {
            Some(status) => Err(AppError::Upstream {
                status,
                body: e.message,
            }),
            None => {
                tracing::error!(error = %e, "Chat completion failed");
                Err(AppError::Internal("Failed to get response".to_string()))
            }
        },
    }
}

async fn method_not_allowed() -> AppError {
    AppError::MethodNotAllowed
}

// ============================================================
// Error handling
// ============================================================

#[derive(Debug)]
enum AppError {
    BadRequest(String),
    MethodNotAllowed,
    /// Provider failure passed through with its own status and body
    Upstream {
        status: u16,
        body: String,
    },
    Internal(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::MethodNotAllowed => (
                StatusCode::METHOD_NOT_ALLOWED,
                "Method not allowed".to_string(),
            ),
            AppError::Upstream { status, body } => (
                StatusCode::from_u16(status).unwrap_or(StatusCode::BAD_GATEWAY),
                body,
            ),
            AppError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };

        (status, Json(ErrorResponse::new(message))).into_response()
    }
}
