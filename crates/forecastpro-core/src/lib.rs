//! Core library of the ForecastPro service.
//!
//! Loads an uploaded CSV table, infers which columns hold the time axis,
//! the grouping keys and the metrics, and forecasts every (metric, group)
//! series over a daily date range with one of four backends.

pub mod arima;
pub mod dates;
pub mod error;
pub mod forecast;
pub mod predict;
pub mod prophet;
pub mod regression;
pub mod schema;
pub mod series;
pub mod table;

// Re-exports for convenience
pub use dates::{
    date_grid, parse_request_date, parse_timestamp, parse_timestamp_styled, DateStyle,
};
pub use error::{ForecastError, Result};
pub use forecast::{list_models, Backend, EtsSpec};
pub use predict::{forecast_all, predict, ForecastRecord, PredictRequest, Prediction};
pub use schema::{infer_roles, ColumnRoles};
pub use series::{Group, Series, SeriesFrame};
pub use table::{Column, ColumnKind, Table, Value};
