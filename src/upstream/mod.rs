//! Upstream text-generation service.
//!
//! - [`gemini`]: REST client for the Gemini `generateContent` family
//! - [`session`]: Single-turn chat session with fixed settings
//! - [`sse`]: Server-sent-event frame decoding for streamed replies
//! - [`types`]: Wire types shared by requests and responses
//! - [`error`]: Upstream failure kinds

pub mod error;
pub mod gemini;
pub mod session;
pub mod sse;
pub mod types;

use std::pin::Pin;

use async_trait::async_trait;
use futures::stream::{Stream, StreamExt};

pub use error::UpstreamError;
pub use gemini::GeminiClient;
pub use session::{ChatSession, SessionSettings};
pub use types::GenerateContentRequest;

/// Lazy, finite sequence of generated text fragments in arrival order.
pub type FragmentStream = Pin<Box<dyn Stream<Item = Result<String, UpstreamError>> + Send>>;

/// A generation backend the relay can talk to.
#[async_trait]
pub trait GenerativeModel: Send + Sync {
    /// Model identifier, for logs and health output.
    fn model_name(&self) -> &str;

    /// Start a streamed generation.
    ///
    /// Resolves once the upstream has accepted the request; fragments are
    /// then pulled lazily from the returned stream.
    async fn stream_generate(
        &self,
        request: GenerateContentRequest,
    ) -> Result<FragmentStream, UpstreamError>;

    /// Generate the whole reply in one call.
    async fn generate(&self, request: GenerateContentRequest) -> Result<String, UpstreamError> {
        let mut fragments = self.stream_generate(request).await?;
        let mut text = String::new();
        while let Some(fragment) = fragments.next().await {
            text.push_str(&fragment?);
        }
        Ok(text)
    }
}
