//! Process entrypoint: builds the engine, starts its default entropy
//! sources, serves the HTTP surface, and shuts down cleanly on Ctrl-C.

use fortuna_engine::{config::AppConfig, http, logging, Engine};
use std::sync::Arc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    logging::init_logging();

    let config = AppConfig::load().unwrap_or_else(|err| {
        tracing::warn!(%err, "failed to load configuration, using defaults");
        AppConfig::default()
    });

    let engine = Arc::new(Engine::new(&config));
    engine.start_default_sources(&config);
    tracing::info!(addr = %config.http_addr, "starting http listener");

    let app = http::router(Arc::clone(&engine));
    let listener = tokio::net::TcpListener::bind(config.http_addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    engine.shutdown().await;
    tracing::info!("shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    tokio::signal::ctrl_c()
        .await
        .expect("failed to install ctrl-c handler");
    tracing::info!("ctrl-c received, shutting down");
}
