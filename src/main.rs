//! Academy Concierge backend
//!
//! Serves the marketing page and the two endpoints it calls: voice web-call
//! creation and chat completion.

use academy_concierge::api::{create_router, AppState};
use academy_concierge::config::ServerConfig;
use academy_concierge::llm::{GeminiService, LlmService, LoggingService};
use academy_concierge::voice::{LoggingWebCallService, RetellService, WebCallService};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "academy_concierge=info,tower_http=debug".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_current_span(false)
                .with_span_list(false),
        )
        .init();

    let config = ServerConfig::from_env();
    tracing::info!(?config, "Configuration loaded");
    if config.gemini_api_key.is_empty() {
        tracing::warn!("GEMINI_API_KEY is not set; chat requests will be rejected upstream");
    }
    if config.retell_api_key.is_empty() {
        tracing::warn!("RETELL_API_KEY is not set; call requests will be rejected upstream");
    }

    let gemini: Arc<dyn LlmService> = Arc::new(GeminiService::new(
        config.gemini_api_key.clone(),
        config.gemini_model.clone(),
    ));
    let llm: Arc<dyn LlmService> = Arc::new(LoggingService::new(gemini));

    let retell: Arc<dyn WebCallService> = Arc::new(RetellService::new(config.retell_api_key.clone()));
    let voice: Arc<dyn WebCallService> = Arc::new(LoggingWebCallService::new(retell));

    let state = AppState::new(llm, voice, config.retell_agent_id.as_str());

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let compression = CompressionLayer::new()
        .gzip(true)
        .br(true)
        .deflate(true)
        .zstd(true);

    let app = create_router(state, &config.static_dir)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(compression);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!(static_dir = %config.static_dir.display(), "Academy Concierge listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutting down");
}
