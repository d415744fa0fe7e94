//! Single-turn chat sessions.

use std::sync::Arc;

use crate::config::Config;
use crate::upstream::error::UpstreamError;
use crate::upstream::types::{Content, GenerateContentRequest, GenerationParams, SafetySetting};
use crate::upstream::{FragmentStream, GenerativeModel};

/// Generation and safety settings applied to every session.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionSettings {
    pub generation: GenerationParams,
    pub safety: Vec<SafetySetting>,
}

impl SessionSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            generation: GenerationParams::from(&config.generation),
            safety: config.safety.iter().map(SafetySetting::from).collect(),
        }
    }
}

/// One exchange with the model. History starts empty and the session is
/// consumed by the message it sends.
pub struct ChatSession {
    model: Arc<dyn GenerativeModel>,
    settings: SessionSettings,
    history: Vec<Content>,
}

impl ChatSession {
    pub fn start(model: Arc<dyn GenerativeModel>, settings: &SessionSettings) -> Self {
        Self {
            model,
            settings: settings.clone(),
            history: Vec::new(),
        }
    }

    /// Build the request carrying `text` as the next user turn.
    pub fn request_for(&self, text: &str) -> GenerateContentRequest {
        let mut contents = self.history.clone();
        contents.push(Content::user(text));

        GenerateContentRequest {
            contents,
            generation_config: Some(self.settings.generation.clone()),
            safety_settings: self.settings.safety.clone(),
        }
    }

    /// Send `text` and stream the reply.
    pub async fn send_message_stream(self, text: &str) -> Result<FragmentStream, UpstreamError> {
        let request = self.request_for(text);
        self.model.stream_generate(request).await
    }

    /// Send `text` and wait for the whole reply.
    pub async fn send_message(self, text: &str) -> Result<String, UpstreamError> {
        let request = self.request_for(text);
        self.model.generate(request).await
    }
}
