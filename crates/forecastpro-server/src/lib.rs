//! HTTP boundary of the ForecastPro service.
//!
//! Exposes `POST /predict/` over the core library and `GET /health`.
//! Callers are authenticated with bearer ID tokens checked by an
//! [`IdentityVerifier`].

pub mod auth;
pub mod config;
pub mod error;
pub mod routes;
pub mod types;

use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;

pub use auth::{AuthError, FirebaseVerifier, Identity, IdentityVerifier};
pub use config::{ConfigError, ServerConfig};
pub use error::ApiError;

/// Default `tracing` filter when `RUST_LOG` is unset.
pub const DEFAULT_LOG_FILTER: &str =
    "forecastpro_server=info,forecastpro_core=info,tower_http=info";

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ServerConfig>,
    pub verifier: Arc<dyn IdentityVerifier>,
}

impl AppState {
    pub fn new(config: ServerConfig, verifier: Arc<dyn IdentityVerifier>) -> Self {
        Self {
            config: Arc::new(config),
            verifier,
        }
    }
}

/// Build the router with its middleware.
pub fn router(state: AppState) -> Router {
    let max_upload_bytes = state.config.max_upload_bytes;

    Router::new()
        .route("/health", get(routes::health))
        .route("/predict/", post(routes::predict))
        .route("/predict", post(routes::predict))
        // The body limit is enforced by the layer, not per extractor
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(max_upload_bytes))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
