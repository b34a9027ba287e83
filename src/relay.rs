use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use axum::{
    Router,
    extract::DefaultBodyLimit,
    http::HeaderValue,
    middleware,
    routing::{get, post},
};
use tokio::signal;
use tower_http::{limit::RequestBodyLimitLayer, trace::TraceLayer};

use crate::config::Config;

pub mod dto;
mod handlers;
pub mod openai;
mod origin;

use openai::OpenAIClient;

pub const BODY_LIMIT: usize = 1024 * 1024;

pub const HEALTH_PATH: &str = "/api/health";
pub const CHAT_PATH: &str = "/api/chat";

/// Read-only per-process state shared by every request.
pub struct AppState {
    api_key: Option<Box<str>>,
    allowed_origins: Vec<HeaderValue>,
    openai: OpenAIClient,
}

impl AppState {
    pub fn new(config: &Config) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.upstream_timeout)
            .build()
            .context("Failed to build upstream HTTP client")?;

        Ok(Self {
            api_key: config.api_key.clone(),
            allowed_origins: origin::parse_allowed_origins(&config.allowed_origins),
            openai: OpenAIClient::new(http, config.chat_completions_url()),
        })
    }
}

pub fn build_router(state: Arc<AppState>) -> Router {
    let cors = origin::cors_layer(&state.allowed_origins);

    Router::new()
        .route(HEALTH_PATH, get(handlers::health_check))
        .route(CHAT_PATH, post(handlers::chat_handler))
        .layer(DefaultBodyLimit::max(BODY_LIMIT))
        .layer(RequestBodyLimitLayer::new(BODY_LIMIT))
        .layer(cors)
        .layer(middleware::from_fn_with_state(
            state.clone(),
            origin::reject_foreign_origin,
        ))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub async fn serve(config: Config) -> anyhow::Result<()> {
    if config.api_key.is_none() {
        tracing::warn!("OPENAI_API_KEY is not set, {} will fail", CHAT_PATH);
    }

    let state = Arc::new(AppState::new(&config)?);
    let router = build_router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;

    tracing::info!("Chat relay listening on {}", addr);
    tracing::info!("Health check at: http://localhost:{}{}", config.port, HEALTH_PATH);

    axum::serve(listener, router.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(error) = signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {}", error);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut terminate) => {
                terminate.recv().await;
            }
            Err(error) => {
                tracing::error!("Failed to listen for SIGTERM: {}", error);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("Received Ctrl+C, shutting down"),
        _ = terminate => tracing::info!("Received terminate signal, shutting down"),
    }
}
