//! # forecastpro-server
//!
//! Serves the ForecastPro prediction API.

use std::sync::Arc;

use anyhow::Context;
use forecastpro_server::{router, AppState, FirebaseVerifier, ServerConfig, DEFAULT_LOG_FILTER};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file (optional - won't fail if missing)
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| DEFAULT_LOG_FILTER.into()),
        )
        .init();

    let config = ServerConfig::from_env().context("Invalid configuration")?;
    if config.firebase_api_key.is_none() {
        tracing::warn!(
            "FORECASTPRO_FIREBASE_API_KEY is not set; every authenticated request will be rejected"
        );
    }

    let verifier = FirebaseVerifier::new(
        config.identity_url.clone(),
        config.firebase_api_key.clone(),
    );
    let (host, port) = (config.host.clone(), config.port);
    let app = router(AppState::new(config, Arc::new(verifier)));

    let listener = tokio::net::TcpListener::bind((host.as_str(), port))
        .await
        .with_context(|| format!("Failed to bind {}:{}", host, port))?;

    tracing::info!(
        "forecastpro-server v{} listening on {}",
        env!("CARGO_PKG_VERSION"),
        listener.local_addr()?
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutting down");
}
