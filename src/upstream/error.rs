use std::time::Duration;

use thiserror::Error;

use crate::upstream::types::ApiErrorBody;

#[derive(Error, Debug)]
pub enum UpstreamError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Upstream returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Upstream API error {code} ({status}): {message}")]
    Api {
        code: u16,
        status: String,
        message: String,
    },

    #[error("Failed to decode upstream payload: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("Upstream did not answer within {0:?}")]
    Timeout(Duration),

    #[error("Generation blocked: {0}")]
    Blocked(String),

    #[error("API key is not a valid header value")]
    InvalidApiKey,
}

impl UpstreamError {
    /// Map a non-success HTTP response to an error, preferring the
    /// structured `{"error": {...}}` body when the upstream sent one.
    pub fn from_status(status: u16, body: &str) -> Self {
        match serde_json::from_str::<ApiErrorBody>(body) {
            Ok(parsed) => parsed.into(),
            Err(_) => UpstreamError::Status {
                status,
                body: body.trim().to_string(),
            },
        }
    }
}

impl From<ApiErrorBody> for UpstreamError {
    fn from(body: ApiErrorBody) -> Self {
        UpstreamError::Api {
            code: body.error.code,
            status: body.error.status.unwrap_or_default(),
            message: body.error.message,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_structured_error_body() {
        let body = r#"{"error": {"code": 400, "message": "API key not valid.", "status": "INVALID_ARGUMENT"}}"#;
        match UpstreamError::from_status(400, body) {
            UpstreamError::Api {
                code,
                status,
                message,
            } => {
                assert_eq!(code, 400);
                assert_eq!(status, "INVALID_ARGUMENT");
                assert_eq!(message, "API key not valid.");
            }
            other => panic!("Unexpected error: {other}"),
        }
    }

    #[test]
    fn test_unstructured_error_body() {
        match UpstreamError::from_status(502, "bad gateway\n") {
            UpstreamError::Status { status, body } => {
                assert_eq!(status, 502);
                assert_eq!(body, "bad gateway");
            }
            other => panic!("Unexpected error: {other}"),
        }
    }
}
