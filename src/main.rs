//! chat-relay binary: runs the relay server, or asks a running one.

use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tokio::net::TcpListener;
use tracing::{info, warn};

use chat_relay::client;
use chat_relay::config::{Cli, Command, Config};
use chat_relay::server::{build_app, AppState};
use chat_relay::upstream::{GeminiClient, GenerativeModel};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Parse CLI arguments.
    let cli = Cli::parse();

    // Initialize tracing/logging.
    let filter = if cli.verbose {
        "chat_relay=debug,tower_http=debug"
    } else {
        "chat_relay=info,tower_http=info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| filter.into()),
        )
        .with_target(true)
        .init();

    match cli.command.clone().unwrap_or(Command::Serve) {
        Command::Serve => serve(cli).await,
        Command::Ask { message, url } => ask(&url, &message).await,
    }
}

async fn serve(cli: Cli) -> anyhow::Result<()> {
    info!("chat-relay v{}", env!("CARGO_PKG_VERSION"));

    match dotenvy::dotenv() {
        Ok(path) => info!(path = %path.display(), "Loaded environment file"),
        Err(e) if e.not_found() => {}
        Err(e) => warn!("Could not read .env: {e}"),
    }

    // Load configuration.
    let mut config = Config::load(&cli.config)?;
    if let Some(listen) = cli.listen {
        config.server.listen = listen;
    }

    info!(
        model = config.upstream.model,
        temperature = config.generation.temperature,
        top_p = config.generation.top_p,
        top_k = config.generation.top_k,
        max_output_tokens = config.generation.max_output_tokens,
        "Configuration loaded"
    );

    // Build the upstream client once; handlers share it.
    let model: Option<Arc<dyn GenerativeModel>> = match config.api_key() {
        Some(key) => Some(Arc::new(
            GeminiClient::new(&config.upstream, &key).context("building Gemini client")?,
        )),
        None if config.upstream.require_api_key => {
            anyhow::bail!("Falta {} en .env", config.upstream.api_key_env);
        }
        None => {
            warn!(
                var = config.upstream.api_key_env,
                "No API key configured, generation requests will fail"
            );
            None
        }
    };

    let state = Arc::new(AppState::new(&config, model));
    let app = build_app(state, &config.server);

    // Start the server.
    let listen_addr = config.server.listen.clone();
    let listener = TcpListener::bind(&listen_addr).await?;
    info!("Listening on http://{listen_addr}");

    axum::serve(listener, app).await?;

    Ok(())
}

async fn ask(url: &str, message: &str) -> anyhow::Result<()> {
    let mut stdout = std::io::stdout();
    let outcome = client::ask(url, message, &mut stdout).await?;
    println!();

    if outcome.markers.error {
        anyhow::bail!("the server reported an upstream error");
    }
    if outcome.is_empty() {
        eprintln!("Respuesta vacía. Por favor, intenta de nuevo.");
    }
    Ok(())
}
