//! Request-level orchestration: from an uploaded file and request fields to
//! forecast records.

use std::collections::BTreeMap;

use chrono::NaiveDate;

use crate::dates::{date_grid, parse_request_date};
use crate::error::Result;
use crate::forecast::Backend;
use crate::schema::{infer_roles, ColumnRoles};
use crate::series::{unique_group_values, SeriesFrame};
use crate::table::Table;

/// One prediction request, with every field still as received.
#[derive(Debug, Clone)]
pub struct PredictRequest {
    /// Raw CSV upload
    pub file: Vec<u8>,
    pub start_date: String,
    pub end_date: String,
    pub model_name: String,
}

/// One forecast value for one (metric, group) series on one date.
#[derive(Debug, Clone, PartialEq)]
pub struct ForecastRecord {
    pub date: NaiveDate,
    pub value: f64,
    pub metric: String,
    pub model: String,
    /// Grouping column name to value; `None` for an ungrouped table
    pub group: Option<BTreeMap<String, String>>,
}

/// Everything computed for a request.
#[derive(Debug, Clone)]
pub struct Prediction {
    pub records: Vec<ForecastRecord>,
    /// Distinct values of each grouping column, in first-appearance order
    pub unique_group_values: BTreeMap<String, Vec<String>>,
    pub roles: ColumnRoles,
}

/// Run a request end to end.
///
/// Steps run in a fixed order and the first failure aborts the request:
/// request dates, table, column roles, model name, then every
/// (metric, group) forecast.
pub fn predict(request: &PredictRequest) -> Result<Prediction> {
    let start = parse_request_date(&request.start_date)?;
    let end = parse_request_date(&request.end_date)?;

    let table = Table::from_csv(&request.file)?;
    let roles = infer_roles(&table)?;
    let backend: Backend = request.model_name.parse()?;

    let unique_group_values = unique_group_values(&table, &roles)?;
    let grid = date_grid(start, end);

    tracing::info!(
        model = backend.name(),
        rows = table.n_rows(),
        columns = table.n_columns(),
        metrics = roles.metric_columns.len(),
        horizon = grid.len(),
        "Running forecast"
    );

    let records = forecast_all(&table, &roles, &backend, &grid)?;

    Ok(Prediction {
        records,
        unique_group_values,
        roles,
    })
}

/// Forecast every metric for every group over `grid`.
///
/// Metrics are visited in table order and groups in key order. Empty series
/// are skipped; any backend failure aborts with no partial result.
pub fn forecast_all(
    table: &Table,
    roles: &ColumnRoles,
    backend: &Backend,
    grid: &[NaiveDate],
) -> Result<Vec<ForecastRecord>> {
    let frame = SeriesFrame::new(table, roles)?;
    let mut records = Vec::new();

    if grid.is_empty() {
        tracing::debug!("Empty date range, nothing to forecast");
        return Ok(records);
    }

    for metric in &roles.metric_columns {
        for group in frame.groups() {
            let series = frame.series(table, metric, group)?;
            if series.is_empty() {
                tracing::debug!(metric = %metric, group = ?group.key, "Skipping empty series");
                continue;
            }

            let point = backend.forecast(&series, grid)?;
            let labels = group.labels(roles);

            records.extend(grid.iter().zip(point).map(|(date, value)| ForecastRecord {
                date: *date,
                value,
                metric: metric.clone(),
                model: backend.name().to_string(),
                group: labels.clone(),
            }));
        }
    }

    Ok(records)
}
