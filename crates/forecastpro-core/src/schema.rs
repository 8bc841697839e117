//! Column role inference.
//!
//! A single pass over the table decides which column is the time axis, which
//! columns partition the rows into groups and which columns are forecast.
//! Everything downstream works from the resulting [`ColumnRoles`].

use crate::dates::{parse_timestamp_styled, DateStyle};
use crate::error::{ForecastError, Result};
use crate::table::{Column, ColumnKind, Table, Value};

/// Roles assigned to the columns of a table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnRoles {
    /// The timestamp axis
    pub time_column: String,
    /// Categorical columns whose value combinations define groups, sorted by name
    pub grouping_columns: Vec<String>,
    /// Numeric columns to forecast, in table order
    pub metric_columns: Vec<String>,
}

impl ColumnRoles {
    pub fn is_grouped(&self) -> bool {
        !self.grouping_columns.is_empty()
    }
}

/// Infer column roles.
///
/// The time axis is the first text column (in table order) whose every
/// present value parses as a timestamp, all in one spelling family. The
/// remaining text columns become grouping columns and every numeric column
/// becomes a metric.
pub fn infer_roles(table: &Table) -> Result<ColumnRoles> {
    let time_column = table
        .columns()
        .iter()
        .filter(|c| c.kind() == ColumnKind::Text)
        .find(|c| is_datetime_column(c))
        .map(|c| c.name().to_string())
        .ok_or(ForecastError::NoDatetimeColumn)?;

    let mut grouping_columns: Vec<String> = table
        .columns()
        .iter()
        .filter(|c| c.kind() == ColumnKind::Text && c.name() != time_column)
        .map(|c| c.name().to_string())
        .collect();
    grouping_columns.sort();

    let metric_columns: Vec<String> = table
        .columns()
        .iter()
        .filter(|c| c.kind() == ColumnKind::Numeric)
        .map(|c| c.name().to_string())
        .collect();

    if metric_columns.is_empty() {
        return Err(ForecastError::NoMetricColumn);
    }

    tracing::debug!(
        time_column = %time_column,
        grouping = ?grouping_columns,
        metrics = ?metric_columns,
        "Inferred column roles"
    );

    Ok(ColumnRoles {
        time_column,
        grouping_columns,
        metric_columns,
    })
}

fn is_datetime_column(column: &Column) -> bool {
    let mut seen: Option<DateStyle> = None;
    column.values().iter().all(|v| match v {
        Value::Missing => true,
        Value::Text(s) => match parse_timestamp_styled(s) {
            Some((_, style)) => *seen.get_or_insert(style) == style,
            None => false,
        },
        Value::Number(_) | Value::Bool(_) => false,
    })
}
