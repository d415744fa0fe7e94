//! Gemini REST client.
//!
//! Talks to `{base_url}/models/{model}:streamGenerateContent?alt=sse` for
//! streamed replies and `:generateContent` for single-shot ones. The API key
//! travels in the `x-goog-api-key` header, never in the URL.

use std::time::Duration;

use async_trait::async_trait;
use futures::stream::StreamExt;
use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::Response;
use tracing::debug;

use crate::config::UpstreamConfig;
use crate::upstream::error::UpstreamError;
use crate::upstream::sse;
use crate::upstream::types::{ApiErrorBody, GenerateContentRequest, GenerateContentResponse};
use crate::upstream::{FragmentStream, GenerativeModel};

const API_KEY_HEADER: &str = "x-goog-api-key";

/// Client for one Gemini model, built once at startup and shared.
#[derive(Debug, Clone)]
pub struct GeminiClient {
    http: reqwest::Client,
    base_url: String,
    model: String,
    request_timeout: Duration,
}

impl GeminiClient {
    pub fn new(config: &UpstreamConfig, api_key: &str) -> Result<Self, UpstreamError> {
        let mut key = HeaderValue::from_str(api_key).map_err(|_| UpstreamError::InvalidApiKey)?;
        key.set_sensitive(true);

        let mut headers = HeaderMap::new();
        headers.insert(API_KEY_HEADER, key);

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .build()?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.trim_start_matches("models/").to_string(),
            request_timeout: Duration::from_secs(config.request_timeout_secs),
        })
    }

    /// URL of a model method such as `generateContent`.
    pub fn endpoint(&self, method: &str) -> String {
        format!("{}/models/{}:{}", self.base_url, self.model, method)
    }

    /// POST a request and wait for a successful status line.
    ///
    /// Only the wait for response headers is bounded by the timeout; a
    /// streamed body may take as long as the model needs.
    async fn send(
        &self,
        method: &str,
        request: &GenerateContentRequest,
        stream: bool,
    ) -> Result<Response, UpstreamError> {
        let url = self.endpoint(method);
        debug!(url = %url, stream, "Sending upstream request");

        let mut builder = self.http.post(&url).json(request);
        if stream {
            builder = builder.query(&[("alt", "sse")]);
        }

        let response = tokio::time::timeout(self.request_timeout, builder.send())
            .await
            .map_err(|_| UpstreamError::Timeout(self.request_timeout))??;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(UpstreamError::from_status(status.as_u16(), &body));
        }

        Ok(response)
    }
}

/// Interpret one SSE data payload as a fragment.
fn parse_frame(data: &str) -> Result<String, UpstreamError> {
    let value: serde_json::Value = serde_json::from_str(data)?;
    if value.get("error").is_some() {
        let body: ApiErrorBody = serde_json::from_value(value)?;
        return Err(body.into());
    }
    let response: GenerateContentResponse = serde_json::from_value(value)?;
    log_usage(&response);
    response.into_text()
}

/// Token counts arrive with the final frame of a reply.
fn log_usage(response: &GenerateContentResponse) {
    if let Some(usage) = &response.usage_metadata {
        debug!(
            prompt_tokens = usage.prompt_token_count,
            reply_tokens = usage.candidates_token_count,
            total_tokens = usage.total_token_count,
            "Token usage"
        );
    }
}

#[async_trait]
impl GenerativeModel for GeminiClient {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn stream_generate(
        &self,
        request: GenerateContentRequest,
    ) -> Result<FragmentStream, UpstreamError> {
        let response = self.send("streamGenerateContent", &request, true).await?;

        let fragments = sse::decode_stream(response.bytes_stream()).map(|frame| match frame {
            Ok(data) => parse_frame(&data),
            Err(err) => Err(UpstreamError::Http(err)),
        });

        Ok(Box::pin(fragments))
    }

    async fn generate(&self, request: GenerateContentRequest) -> Result<String, UpstreamError> {
        let response = self.send("generateContent", &request, false).await?;
        let body: GenerateContentResponse = response.json().await?;
        log_usage(&body);
        body.into_text()
    }
}
