//! Mapping of failures to HTTP responses.
//!
//! Every handler returns `Result<_, ApiError>`; an `ApiError` renders as a
//! status code and a `{"detail": ...}` body.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use forecastpro_core::ForecastError;

use crate::auth::AuthError;
use crate::types::ErrorBody;

pub const NOT_AUTHENTICATED: &str = "Not authenticated";
pub const INVALID_CREDENTIALS: &str = "Invalid authentication credentials";

/// An error response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiError {
    pub status: StatusCode,
    pub detail: String,
}

impl ApiError {
    pub fn new(status: StatusCode, detail: impl Into<String>) -> Self {
        Self {
            status,
            detail: detail.into(),
        }
    }

    pub fn forbidden(detail: impl Into<String>) -> Self {
        Self::new(StatusCode::FORBIDDEN, detail)
    }

    pub fn bad_request(detail: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, detail)
    }

    pub fn unprocessable(detail: impl Into<String>) -> Self {
        Self::new(StatusCode::UNPROCESSABLE_ENTITY, detail)
    }

    /// A 500 response. The message is logged under a fresh request id and
    /// only returned to the caller when `expose` is set.
    pub fn internal(message: &str, expose: bool) -> Self {
        let request_id = uuid::Uuid::new_v4();
        tracing::error!(%request_id, error = %message, "Prediction failed");

        let detail = if expose {
            message.to_string()
        } else {
            format!("Prediction failed (request {})", request_id)
        };
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, detail)
    }

    /// Validation failures are 400; anything else is a 500.
    pub fn from_forecast(err: ForecastError, expose: bool) -> Self {
        if err.is_validation() {
            Self::bad_request(err.to_string())
        } else {
            Self::internal(&err.to_string(), expose)
        }
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::MissingCredentials => Self::forbidden(NOT_AUTHENTICATED),
            other => {
                tracing::debug!(error = %other, "Rejected credentials");
                Self::forbidden(INVALID_CREDENTIALS)
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(ErrorBody { detail: self.detail })).into_response()
    }
}

/// Run CPU-bound or blocking work on the blocking pool.
///
/// A panic inside `f` becomes a 500 instead of tearing down the connection.
pub async fn run_blocking<F, T>(f: F, expose: bool) -> Result<T, ApiError>
where
    F: FnOnce() -> Result<T, ApiError> + Send + 'static,
    T: Send + 'static,
{
    match tokio::task::spawn_blocking(f).await {
        Ok(result) => result,
        Err(e) if e.is_panic() => Err(ApiError::internal("Panic in blocking task", expose)),
        Err(e) => Err(ApiError::internal(&e.to_string(), expose)),
    }
}
