//! Risk prediction server entry point

use std::net::SocketAddr;

use anyhow::Context;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use risk_serve::{config::Config, create_router, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // Initialize logging
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| "risk_serve=debug,tower_http=debug".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = Config::from_env();

    tracing::info!("Risk prediction server starting ({})...", config.environment);
    tracing::info!("Model: {}", config.model_path.display());

    let state = AppState::from_config(config.clone());

    if config.preload_model {
        // Not fatal: the cache retries on the first request
        let gateway = state.gateway.clone();
        match tokio::task::spawn_blocking(move || gateway.cache().get_bundle().map(|_| ())).await? {
            Ok(()) => tracing::info!("Model preloaded"),
            Err(e) => tracing::warn!("Model preload failed: {}", e),
        }
    }

    let app = create_router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("🚀 Server listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    axum::serve(listener, app).await.context("server error")?;

    Ok(())
}
