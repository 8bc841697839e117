//! Caller authentication against an external identity service.
//!
//! Requests carry `Authorization: Bearer <ID token>`. The token is handed to
//! an [`IdentityVerifier`]; the production verifier asks the Firebase
//! accounts-lookup endpoint who the token belongs to.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use serde::Deserialize;
use thiserror::Error;

use crate::error::{run_blocking, ApiError};
use crate::AppState;

const LOOKUP_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    #[error("Missing Authorization header")]
    MissingCredentials,

    #[error("Authorization scheme is not Bearer")]
    InvalidScheme,

    #[error("Invalid token: {0}")]
    InvalidToken(String),

    #[error("Identity lookup failed: {0}")]
    Lookup(String),

    #[error("Identity verification is not configured")]
    NotConfigured,
}

/// A verified caller.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Identity {
    pub uid: String,
    pub email: Option<String>,
    /// Every other attribute returned by the identity service, uninterpreted
    pub claims: serde_json::Map<String, serde_json::Value>,
}

/// Turns a bearer token into the identity it was issued to.
///
/// Implementations may block; they are always called from the blocking pool.
pub trait IdentityVerifier: Send + Sync + 'static {
    fn verify(&self, token: &str) -> Result<Identity, AuthError>;
}

/// Verifies Firebase ID tokens with the Identity Toolkit accounts-lookup API.
pub struct FirebaseVerifier {
    lookup_url: String,
    api_key: Option<String>,
    agent: ureq::Agent,
}

#[derive(Deserialize)]
struct LookupResponse {
    #[serde(default)]
    users: Vec<serde_json::Map<String, serde_json::Value>>,
}

impl FirebaseVerifier {
    pub fn new(lookup_url: impl Into<String>, api_key: Option<String>) -> Self {
        Self {
            lookup_url: lookup_url.into(),
            api_key,
            agent: ureq::AgentBuilder::new().timeout(LOOKUP_TIMEOUT).build(),
        }
    }
}

impl IdentityVerifier for FirebaseVerifier {
    fn verify(&self, token: &str) -> Result<Identity, AuthError> {
        let api_key = self.api_key.as_deref().ok_or(AuthError::NotConfigured)?;

        let response = self
            .agent
            .post(&self.lookup_url)
            .query("key", api_key)
            .send_json(serde_json::json!({ "idToken": token }));

        let response = match response {
            Ok(r) => r,
            // The service answers 400 INVALID_ID_TOKEN for bad or expired tokens
            Err(ureq::Error::Status(code, r)) => {
                let body = r.into_string().unwrap_or_default();
                return Err(AuthError::InvalidToken(format!("status {}: {}", code, body)));
            }
            Err(e) => return Err(AuthError::Lookup(e.to_string())),
        };

        let lookup: LookupResponse = response
            .into_json()
            .map_err(|e| AuthError::Lookup(format!("Unreadable lookup response: {}", e)))?;

        let user = lookup
            .users
            .into_iter()
            .next()
            .ok_or_else(|| AuthError::InvalidToken("No user for token".to_string()))?;

        identity_from_user(user)
    }
}

/// Map one accounts-lookup user record to an [`Identity`].
fn identity_from_user(
    mut user: serde_json::Map<String, serde_json::Value>,
) -> Result<Identity, AuthError> {
    let uid = match user.remove("localId") {
        Some(serde_json::Value::String(uid)) if !uid.is_empty() => uid,
        _ => {
            return Err(AuthError::InvalidToken(
                "User record has no localId".to_string(),
            ))
        }
    };
    let email = match user.remove("email") {
        Some(serde_json::Value::String(email)) => Some(email),
        _ => None,
    };

    Ok(Identity {
        uid,
        email,
        claims: user,
    })
}

/// Parse an `Authorization` header value into a bearer token.
pub fn bearer_token(header: Option<&str>) -> Result<&str, AuthError> {
    let header = header.map(str::trim).filter(|h| !h.is_empty());
    let header = header.ok_or(AuthError::MissingCredentials)?;

    let (scheme, token) = header.split_once(' ').ok_or(AuthError::InvalidScheme)?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return Err(AuthError::InvalidScheme);
    }
    let token = token.trim();
    if token.is_empty() {
        return Err(AuthError::InvalidScheme);
    }
    Ok(token)
}

/// Extractor for the verified caller of a request.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser(pub Identity);

#[async_trait]
impl FromRequestParts<AppState> for AuthenticatedUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(AUTHORIZATION)
            .map(|v| v.to_str().map_err(|_| AuthError::InvalidScheme))
            .transpose()?;
        let token = bearer_token(header)?.to_string();

        let verifier: Arc<dyn IdentityVerifier> = Arc::clone(&state.verifier);
        let identity = run_blocking(
            move || verifier.verify(&token).map_err(ApiError::from),
            state.config.expose_errors,
        )
        .await?;

        Ok(AuthenticatedUser(identity))
    }
}
