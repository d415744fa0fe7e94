//! HTTP-facing errors.
//!
//! Every variant renders as a plain-text body with the status the browser
//! client expects.

use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use thiserror::Error;
use tracing::{error, warn};

use crate::relay::markers::STREAM_ERROR;
use crate::upstream::UpstreamError;

pub const TEXT_PLAIN_UTF8: &str = "text/plain; charset=utf-8";

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Método no permitido")]
    MethodNotAllowed,

    #[error("Mensaje vacío.")]
    EmptyMessage,

    /// Names the environment variable that should hold the key.
    #[error("Falta {0}")]
    MissingCredential(String),

    /// The upstream refused or failed before any byte was streamed. The
    /// body is the stream error marker alone.
    #[error("Upstream stream unavailable: {0}")]
    StreamUnavailable(#[source] UpstreamError),

    #[error("Error interno del servidor: {0}")]
    Generation(#[source] UpstreamError),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            ApiError::EmptyMessage => StatusCode::BAD_REQUEST,
            ApiError::MissingCredential(_)
            | ApiError::StreamUnavailable(_)
            | ApiError::Generation(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        match &self {
            ApiError::StreamUnavailable(source) | ApiError::Generation(source) => {
                error!(error = %source, "Upstream request failed")
            }
            ApiError::MissingCredential(var) => {
                error!(var = var.as_str(), "Upstream credential not configured")
            }
            _ => warn!(status = status.as_u16(), "Rejected request: {self}"),
        }

        let body = match &self {
            ApiError::StreamUnavailable(_) => STREAM_ERROR.to_string(),
            _ => self.to_string(),
        };

        (status, [(header::CONTENT_TYPE, TEXT_PLAIN_UTF8)], body)
            .into_response()
    }
}
