//! Server configuration from the environment.

use thiserror::Error;

pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 8000;
/// 50 MiB
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 50 * 1024 * 1024;
pub const DEFAULT_IDENTITY_URL: &str = "https://identitytoolkit.googleapis.com/v1/accounts:lookup";

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid value '{value}' for {var}: {reason}")]
    Invalid {
        var: &'static str,
        value: String,
        reason: String,
    },
}

/// Runtime settings of the server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Largest accepted request body, in bytes
    pub max_upload_bytes: usize,
    /// Accounts-lookup endpoint used to verify ID tokens
    pub identity_url: String,
    /// Without a key every authenticated request is rejected
    pub firebase_api_key: Option<String>,
    /// Return raw error messages in 500 responses
    pub expose_errors: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            identity_url: DEFAULT_IDENTITY_URL.to_string(),
            firebase_api_key: None,
            expose_errors: false,
        }
    }
}

impl ServerConfig {
    /// Read `FORECASTPRO_*` variables from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Build from any variable lookup. Unset or empty variables take their
    /// default.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |var: &str| lookup(var).filter(|v| !v.trim().is_empty());
        let defaults = Self::default();

        let port = match get("FORECASTPRO_PORT") {
            Some(raw) => parse_number("FORECASTPRO_PORT", &raw)?,
            None => defaults.port,
        };

        let max_upload_bytes = match get("FORECASTPRO_MAX_UPLOAD_BYTES") {
            Some(raw) => parse_number("FORECASTPRO_MAX_UPLOAD_BYTES", &raw)?,
            None => defaults.max_upload_bytes,
        };
        if max_upload_bytes == 0 {
            return Err(ConfigError::Invalid {
                var: "FORECASTPRO_MAX_UPLOAD_BYTES",
                value: "0".to_string(),
                reason: "must be positive".to_string(),
            });
        }

        let expose_errors = match get("FORECASTPRO_EXPOSE_ERRORS") {
            Some(raw) => parse_flag("FORECASTPRO_EXPOSE_ERRORS", &raw)?,
            None => defaults.expose_errors,
        };

        Ok(Self {
            host: get("FORECASTPRO_HOST").unwrap_or(defaults.host),
            port,
            max_upload_bytes,
            identity_url: get("FORECASTPRO_IDENTITY_URL").unwrap_or(defaults.identity_url),
            firebase_api_key: get("FORECASTPRO_FIREBASE_API_KEY"),
            expose_errors,
        })
    }
}

fn parse_number<T>(var: &'static str, raw: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    raw.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
        var,
        value: raw.to_string(),
        reason: e.to_string(),
    })
}

fn parse_flag(var: &'static str, raw: &str) -> Result<bool, ConfigError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::Invalid {
            var,
            value: raw.to_string(),
            reason: "expected 0 or 1".to_string(),
        }),
    }
}
