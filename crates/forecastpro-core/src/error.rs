//! Error types for table loading, role inference and forecasting.

use thiserror::Error;

/// Result type for forecast operations.
pub type Result<T> = std::result::Result<T, ForecastError>;

/// Error types for forecast operations.
#[derive(Error, Debug)]
pub enum ForecastError {
    #[error("No datetime column detected")]
    NoDatetimeColumn,

    #[error("No metric columns detected")]
    NoMetricColumn,

    #[error("Invalid model name: {0}")]
    InvalidModel(String),

    #[error("Invalid date '{value}': expected YYYY-MM-DD")]
    InvalidDate { value: String },

    #[error("Invalid table: {0}")]
    InvalidTable(String),

    #[error("Insufficient data: need at least {needed} observations, got {got}")]
    InsufficientData { needed: usize, got: usize },

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Computation error: {0}")]
    ComputationError(String),
}

impl ForecastError {
    /// Whether the error describes a problem with the shape of the uploaded
    /// data or the requested model, as opposed to a failure while loading or
    /// fitting.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            ForecastError::NoDatetimeColumn
                | ForecastError::NoMetricColumn
                | ForecastError::InvalidModel(_)
        )
    }
}

impl From<csv::Error> for ForecastError {
    fn from(e: csv::Error) -> Self {
        ForecastError::InvalidTable(e.to_string())
    }
}
