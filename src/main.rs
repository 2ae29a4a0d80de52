//! Daisy B2B Connector
//!
//! A single-page chat front-end that relays an agent's messages to a hosted
//! Gemini model primed with a sales-coaching persona.

mod api;
mod config;
mod conversation;
mod llm;
mod secrets;
mod session;
mod system_prompt;

use api::{create_router, AppState};
use config::AppConfig;
use llm::{ChatModel, GeminiModel, LlmError, LoggingModel};
use secrets::SecretError;
use session::SessionStore;
use std::net::SocketAddr;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tower_http::compression::CompressionLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// How often idle sessions are swept
const SWEEP_INTERVAL: Duration = Duration::from_secs(60);

/// Conditions that stop the process before any conversation runs
#[derive(Debug, Error)]
enum StartupError {
    #[error(transparent)]
    Credential(#[from] SecretError),
    #[error("Error loading the model: {0}")]
    Model(#[from] LlmError),
}

fn build_model(config: &AppConfig) -> Result<Arc<dyn ChatModel>, StartupError> {
    let api_key = secrets::resolve_api_key(&config.secrets_path)?;
    tracing::info!(source = ?api_key.source(), "API key resolved");

    let gemini = GeminiModel::new(
        api_key,
        &config.model,
        &config.api_base,
        system_prompt::SYSTEM_INSTRUCTION,
        config.generation,
        config.request_timeout,
    )?;
    Ok(Arc::new(LoggingModel::new(Arc::new(gemini))))
}

#[tokio::main]
async fn main() -> Result<ExitCode, Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "daisy_connector=info,tower_http=info".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_current_span(false)
                .with_span_list(false),
        )
        .init();

    let config = AppConfig::from_env();

    let model = match build_model(&config) {
        Ok(model) => model,
        Err(e) => {
            tracing::error!(error = %e, "Startup failed");
            eprintln!("{e}");
            return Ok(ExitCode::FAILURE);
        }
    };
    tracing::info!(model = %model.model_id(), "Chat model ready");

    let sessions = Arc::new(SessionStore::new(config.session_idle));
    session::spawn_sweeper(sessions.clone(), SWEEP_INTERVAL);

    let state = AppState::new(sessions, model, system_prompt::PAGE);

    let compression = CompressionLayer::new().gzip(true).br(true).deflate(true).zstd(true);
    let app = create_router(state).layer(compression);

    // Start server
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("Daisy B2B Connector listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(ExitCode::SUCCESS)
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutting down");
}
