//! Runtime configuration for chat-relay.
//!
//! Configuration is loaded from a JSON file or constructed programmatically.
//! Every section falls back to its defaults, so a partial file (or none at
//! all) yields the stock Gemini setup: `gemini-2.5-pro`, temperature 0.3,
//! top-p 0.8, top-k 30, 8192 output tokens, harassment filter disabled.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};

/// Command-line arguments.
#[derive(Parser, Debug, Clone)]
#[command(name = "chat-relay", about = "Streaming Gemini chat relay")]
pub struct Cli {
    /// Path to configuration file (JSON).
    #[arg(short, long, default_value = "config.json")]
    pub config: PathBuf,

    /// HTTP listen address (overrides `server.listen`).
    #[arg(long)]
    pub listen: Option<String>,

    /// Enable verbose logging.
    #[arg(short, long)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Run the HTTP server (default).
    Serve,

    /// Send one message to a running server and print the streamed reply.
    Ask {
        /// Message to send.
        message: String,

        /// Stream endpoint of the server.
        #[arg(long, default_value = "http://localhost:3000/api/chat-stream")]
        url: String,
    },
}

/// Top-level configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Server configuration.
    pub server: ServerConfig,

    /// Upstream API configuration.
    pub upstream: UpstreamConfig,

    /// Fixed generation parameters sent with every session.
    pub generation: GenerationConfig,

    /// Safety settings sent with every session.
    pub safety: Vec<SafetyConfig>,

    /// Prompt text.
    pub prompt: PromptConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            upstream: UpstreamConfig::default(),
            generation: GenerationConfig::default(),
            safety: vec![SafetyConfig::permissive_harassment()],
            prompt: PromptConfig::default(),
        }
    }
}

/// HTTP server settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Listen address (e.g. "0.0.0.0:3000").
    pub listen: String,

    /// Directory holding the browser frontend.
    pub static_dir: PathBuf,

    /// Attach a permissive CORS layer.
    pub cors: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: "0.0.0.0:3000".to_string(),
            static_dir: PathBuf::from("static"),
            cors: true,
        }
    }
}

/// Upstream generation service settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UpstreamConfig {
    /// REST base URL, without trailing slash.
    pub base_url: String,

    /// Model name, with or without the `models/` prefix.
    pub model: String,

    /// Environment variable holding the API key.
    pub api_key_env: String,

    /// Refuse to start when the API key is missing.
    ///
    /// When false the server starts anyway and answers 500 on every
    /// generation request.
    pub require_api_key: bool,

    /// TCP connect timeout in seconds.
    pub connect_timeout_secs: u64,

    /// Seconds allowed for the upstream to answer with response headers.
    pub request_timeout_secs: u64,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            base_url: "https://generativelanguage.googleapis.com/v1beta".to_string(),
            model: "gemini-2.5-pro".to_string(),
            api_key_env: "GEMINI_API_KEY".to_string(),
            require_api_key: true,
            connect_timeout_secs: 10,
            request_timeout_secs: 60,
        }
    }
}

/// Sampling parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationConfig {
    pub temperature: f32,
    pub top_p: f32,
    pub top_k: u32,
    pub max_output_tokens: u32,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            temperature: 0.3,
            top_p: 0.8,
            top_k: 30,
            max_output_tokens: 8192,
        }
    }
}

/// One safety filter override.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SafetyConfig {
    /// Harm category, e.g. `HARM_CATEGORY_HARASSMENT`.
    pub category: String,

    /// Block threshold, e.g. `BLOCK_NONE`.
    pub threshold: String,
}

impl SafetyConfig {
    /// The permissive harassment setting used by default.
    pub fn permissive_harassment() -> Self {
        Self {
            category: "HARM_CATEGORY_HARASSMENT".to_string(),
            threshold: "BLOCK_NONE".to_string(),
        }
    }
}

/// Instructional text wrapped around every user message.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PromptConfig {
    /// Preamble placed before the question.
    pub preamble: String,

    /// Label introducing the user's question.
    pub question_label: String,

    /// Message used by the single-shot endpoint when none is given.
    pub fallback_message: String,
}

pub const DEFAULT_PREAMBLE: &str = "\
Eres un profesor experto en transmisión de datos y redes.
Responde de manera seria, clara y profesional en español.
Usa un tono académico, sin emojis ni lenguaje casual.
Sé conciso pero completo. Proporciona información directa y bien estructurada.

IMPORTANTE - Formato de respuesta:
- Usa **texto entre asteriscos** para poner en negrita
- Usa *texto entre un asterisco* para cursiva
- Usa # para títulos principales, ## para subtítulos, ### para sub-subtítulos
- Usa listas numeradas (1. 2. 3.) o viñetas (* o -) para enumeraciones
- Separa párrafos con líneas en blanco
- Ve directo al punto sin introducciones largas";

impl Default for PromptConfig {
    fn default() -> Self {
        Self {
            preamble: DEFAULT_PREAMBLE.to_string(),
            question_label: "Pregunta".to_string(),
            fallback_message: "Hola, soy un bot Gemini!".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from a JSON file, falling back to defaults for missing fields.
    pub fn load(path: &std::path::Path) -> anyhow::Result<Self> {
        if path.exists() {
            let data = std::fs::read_to_string(path)?;
            let config: Config = serde_json::from_str(&data)?;
            Ok(config)
        } else {
            tracing::warn!("Config file not found at {:?}, using defaults", path);
            Ok(Config::default())
        }
    }

    /// Read the upstream API key from the configured environment variable.
    ///
    /// Empty values count as missing.
    pub fn api_key(&self) -> Option<String> {
        std::env::var(&self.upstream.api_key_env)
            .ok()
            .filter(|key| !key.trim().is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let cfg = Config::default();
        assert_eq!(cfg.generation.temperature, 0.3);
        assert_eq!(cfg.generation.top_k, 30);
        assert_eq!(cfg.generation.max_output_tokens, 8192);
        assert_eq!(cfg.upstream.model, "gemini-2.5-pro");
        assert_eq!(cfg.safety, vec![SafetyConfig::permissive_harassment()]);
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"server": {{"listen": "127.0.0.1:9000"}}, "generation": {{"top_k": 5}}}}"#
        )
        .unwrap();

        let cfg = Config::load(file.path()).unwrap();
        assert_eq!(cfg.server.listen, "127.0.0.1:9000");
        assert!(cfg.server.cors);
        assert_eq!(cfg.generation.top_k, 5);
        assert_eq!(cfg.generation.top_p, 0.8);
        assert_eq!(cfg.prompt.question_label, "Pregunta");
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = Config::load(&dir.path().join("absent.json")).unwrap();
        assert_eq!(cfg.upstream.api_key_env, "GEMINI_API_KEY");
    }

    #[test]
    fn test_invalid_file_is_an_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "not json").unwrap();
        assert!(Config::load(file.path()).is_err());
    }

    #[test]
    fn test_blank_api_key_counts_as_missing() {
        let mut cfg = Config::default();
        cfg.upstream.api_key_env = "CHAT_RELAY_TEST_BLANK_KEY".to_string();
        std::env::set_var("CHAT_RELAY_TEST_BLANK_KEY", "   ");
        assert_eq!(cfg.api_key(), None);
        std::env::set_var("CHAT_RELAY_TEST_BLANK_KEY", "abc");
        assert_eq!(cfg.api_key().as_deref(), Some("abc"));
    }
}
