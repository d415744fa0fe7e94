//! HTTP server for the chat frontend.
//!
//! - [`chat_api`]: Request types, state and route handlers
//! - [`streaming`]: Chunked plain-text response bodies

pub mod chat_api;
pub mod streaming;

use std::sync::Arc;

use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::services::{ServeDir, ServeFile};
use tower_http::trace::TraceLayer;
use tracing::warn;

use crate::config::ServerConfig;

pub use chat_api::{build_router, AppState};

/// The API router plus the static frontend, CORS and request tracing.
pub fn build_app(state: Arc<AppState>, config: &ServerConfig) -> Router {
    let mut app = build_router(state);

    let static_dir = &config.static_dir;
    if static_dir.is_dir() {
        let index = static_dir.join("index.html");
        app = app.fallback_service(ServeDir::new(static_dir).not_found_service(ServeFile::new(index)));
    } else {
        warn!(dir = %static_dir.display(), "Static directory not found, frontend disabled");
    }

    if config.cors {
        app = app.layer(CorsLayer::permissive());
    }

    app.layer(TraceLayer::new_for_http())
}
