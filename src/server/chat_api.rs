//! Chat HTTP API.
//!
//! - POST /api/chat-stream: chunked plain-text reply framed by sentinel markers
//! - POST /api/chat: whole reply in one plain-text body
//! - GET /health

use std::sync::Arc;
use std::time::Instant;

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tracing::{error, info};
use uuid::Uuid;

use crate::config::Config;
use crate::error::{ApiError, TEXT_PLAIN_UTF8};
use crate::relay::{PromptTemplate, Relay};
use crate::server::streaming::chunked_text_response;
use crate::upstream::{ChatSession, GenerativeModel, SessionSettings};

/// Application state shared across handlers.
pub struct AppState {
    /// Upstream model; `None` when no credential was configured.
    pub model: Option<Arc<dyn GenerativeModel>>,
    pub session: SessionSettings,
    pub prompt: PromptTemplate,
    pub fallback_message: String,
    /// Environment variable the credential is read from, for error text.
    pub credential_var: String,
    pub start_time: Instant,
}

impl AppState {
    pub fn new(config: &Config, model: Option<Arc<dyn GenerativeModel>>) -> Self {
        Self {
            model,
            session: SessionSettings::from_config(config),
            prompt: PromptTemplate::from(&config.prompt),
            fallback_message: config.prompt.fallback_message.clone(),
            credential_var: config.upstream.api_key_env.clone(),
            start_time: Instant::now(),
        }
    }

    fn require_model(&self) -> Result<Arc<dyn GenerativeModel>, ApiError> {
        self.model
            .clone()
            .ok_or_else(|| ApiError::MissingCredential(self.credential_var.clone()))
    }
}

/// Build the axum router with the API routes.
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route(
            "/api/chat-stream",
            post(chat_stream).fallback(method_not_allowed),
        )
        .route("/api/chat", post(chat_once).fallback(method_not_allowed))
        .route("/health", get(health))
        .with_state(state)
}

// ─── Request/Response Types ────────────────────────────────────────────────

/// Body of both chat endpoints.
#[derive(Debug, Default, Deserialize)]
pub struct ChatRequest {
    #[serde(default)]
    pub message: Option<String>,
}

impl ChatRequest {
    /// The trimmed message, if there is one.
    pub fn message(&self) -> Option<&str> {
        self.message
            .as_deref()
            .map(str::trim)
            .filter(|m| !m.is_empty())
    }
}

/// An unreadable body counts as a request without a message.
fn parse_body(payload: Result<Json<ChatRequest>, JsonRejection>) -> ChatRequest {
    match payload {
        Ok(Json(req)) => req,
        Err(rejection) => {
            info!("Unreadable chat request body: {rejection}");
            ChatRequest::default()
        }
    }
}

/// Health check response.
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub uptime_secs: u64,
    pub model: Option<String>,
    pub credential_configured: bool,
}

// ─── Route Handlers ────────────────────────────────────────────────────────

async fn chat_stream(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<ChatRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let req = parse_body(payload);
    let message = req.message().ok_or(ApiError::EmptyMessage)?;
    let model = state.require_model()?;

    let request_id = Uuid::new_v4().to_string();
    info!(
        request_id = request_id,
        model = model.model_name(),
        chars = message.chars().count(),
        "Chat stream request"
    );

    let session = ChatSession::start(model, &state.session);
    let fragments = session
        .send_message_stream(&state.prompt.render(message))
        .await
        .map_err(|e| {
            error!(request_id = request_id, "Could not open upstream stream");
            ApiError::StreamUnavailable(e)
        })?;

    let relay = Relay::new(request_id, fragments);
    Ok(chunked_text_response(relay.into_body_stream()))
}

async fn chat_once(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<ChatRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let req = parse_body(payload);
    let model = state.require_model()?;
    let message = req.message().unwrap_or(&state.fallback_message);

    let request_id = Uuid::new_v4().to_string();
    info!(
        request_id = request_id,
        model = model.model_name(),
        "Single-shot chat request"
    );

    let text = ChatSession::start(model, &state.session)
        .send_message(message)
        .await
        .map_err(ApiError::Generation)?;

    info!(request_id = request_id, bytes = text.len(), "Reply complete");
    Ok(([(axum::http::header::CONTENT_TYPE, TEXT_PLAIN_UTF8)], text).into_response())
}

async fn method_not_allowed() -> ApiError {
    ApiError::MethodNotAllowed
}

async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        uptime_secs: state.start_time.elapsed().as_secs(),
        model: state.model.as_ref().map(|m| m.model_name().to_string()),
        credential_configured: state.model.is_some(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_is_trimmed() {
        let req: ChatRequest = serde_json::from_str(r#"{"message": "  hola \n"}"#).unwrap();
        assert_eq!(req.message(), Some("hola"));
    }

    #[test]
    fn test_blank_and_missing_message() {
        let blank: ChatRequest = serde_json::from_str(r#"{"message": "   "}"#).unwrap();
        assert_eq!(blank.message(), None);

        let missing: ChatRequest = serde_json::from_str("{}").unwrap();
        assert_eq!(missing.message(), None);

        let null: ChatRequest = serde_json::from_str(r#"{"message": null}"#).unwrap();
        assert_eq!(null.message(), None);
    }
}
