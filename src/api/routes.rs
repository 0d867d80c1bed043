//! HTTP route handlers.

use std::sync::Arc;

use axum::{extract::State, response::Json, routing::get, Router};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::config::Config;
use crate::credentials::CredentialBuilder;
use crate::n8n;
use crate::token_store::{self, TokenStore};

use super::credentials as credentials_api;
use super::types::HealthResponse;

/// Shared application state.
pub struct AppState {
    pub config: Config,
    /// OAuth token storage
    pub tokens: Arc<dyn TokenStore>,
    /// Builds upstream payloads from caller descriptors
    pub builder: CredentialBuilder,
    /// Shared HTTP client for n8n calls (carries the upstream timeout)
    pub http: reqwest::Client,
}

impl AppState {
    pub fn new(config: Config, tokens: Arc<dyn TokenStore>) -> anyhow::Result<Self> {
        let http = n8n::build_http_client(config.upstream_timeout)?;
        let builder = CredentialBuilder::new(
            Arc::clone(&tokens),
            config.provider_secrets.clone(),
            config.token_store.timeout,
        );
        Ok(Self {
            config,
            tokens,
            builder,
            http,
        })
    }
}

/// Build the application router.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/api/health", get(health))
        .nest("/proxy/credentials", credentials_api::routes())
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Start the HTTP server.
pub async fn serve(config: Config) -> anyhow::Result<()> {
    let tokens =
        token_store::create_token_store(config.token_store.store_type, &config.token_store.db_path)
            .await?;
    tracing::info!(
        "Token store initialized ({}, persistent={})",
        tokens.backend_name(),
        tokens.is_persistent()
    );
    if let Some(warning) = ephemeral_store_warning(tokens.as_ref()) {
        tracing::warn!("{}", warning);
    }

    if config.provider_secrets.is_empty() {
        tracing::info!("No provider client secrets configured");
    } else {
        for provider in config.provider_secrets.providers() {
            tracing::info!("Provider defaults loaded: {:?}", provider);
        }
    }

    let addr = format!("{}:{}", config.host, config.port);
    let state = Arc::new(AppState::new(config, tokens)?);
    let app = router(state);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Credential Creation Proxy listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Graceful shutdown complete");
    Ok(())
}

/// Non-persistent stores start empty and have no writer, so oauth lookups
/// against them always miss.
fn ephemeral_store_warning(tokens: &dyn TokenStore) -> Option<String> {
    if tokens.is_persistent() {
        return None;
    }
    Some(format!(
        "Token store '{}' is not persistent; every oauth create will return 404. Use TOKEN_STORE=sqlite outside tests",
        tokens.backend_name()
    ))
}

/// Wait for SIGINT or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}

/// Liveness banner.
async fn root() -> &'static str {
    "n8n Credential Creation Proxy is running"
}

/// Health check endpoint.
async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        token_store: state.tokens.backend_name().to_string(),
        persistent: state.tokens.is_persistent(),
    })
}
