use std::sync::Arc;

use anyhow::Context;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use sitescan_client::{build_orchestrator, probe_capabilities};
use sitescan_core::config::CrawlerConfig;
use sitescan_core::job_store::InMemoryJobStore;
use sitescan_server::routes;
use sitescan_server::state::AppState;

const DEFAULT_PORT: u16 = 8000;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("sitescan=info".parse()?))
        .with_target(false)
        .init();

    let port = match std::env::var("SITESCAN_SERVER_PORT") {
        Ok(raw) => raw
            .trim()
            .parse::<u16>()
            .with_context(|| format!("Invalid SITESCAN_SERVER_PORT '{raw}'"))?,
        Err(_) => DEFAULT_PORT,
    };
    let api_key = std::env::var("SITESCAN_API_KEY").ok();
    if api_key.is_none() {
        tracing::warn!("SITESCAN_API_KEY not set, job endpoints are unauthenticated");
    }

    let config = CrawlerConfig::from_env().context("Invalid crawler configuration")?;
    let capabilities = probe_capabilities();
    let orchestrator = build_orchestrator(&config, &capabilities, InMemoryJobStore::new())
        .context("Failed to build crawl pipeline")?;

    let state = Arc::new(AppState::new(orchestrator.clone(), capabilities, api_key));

    let app = routes::router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr = format!("0.0.0.0:{port}");
    tracing::info!("Starting server on {addr}");
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    orchestrator.shutdown();
    tracing::info!("In-flight crawl jobs cancelled");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to install CTRL+C handler");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
