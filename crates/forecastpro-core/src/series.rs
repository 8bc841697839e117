//! Grouping of rows and extraction of per-(metric, group) series.

use std::collections::BTreeMap;

use chrono::NaiveDateTime;

use crate::dates::parse_timestamp;
use crate::error::{ForecastError, Result};
use crate::schema::ColumnRoles;
use crate::table::{Column, Table};

/// Rows sharing one combination of grouping values.
#[derive(Debug, Clone, PartialEq)]
pub struct Group {
    /// One value per grouping column, in `ColumnRoles::grouping_columns` order.
    /// Empty for an ungrouped table.
    pub key: Vec<String>,
    /// Row indices in table order
    pub rows: Vec<usize>,
}

impl Group {
    /// Mapping from grouping column name to this group's value, or `None`
    /// for an ungrouped table.
    pub fn labels(&self, roles: &ColumnRoles) -> Option<BTreeMap<String, String>> {
        if !roles.is_grouped() {
            return None;
        }
        Some(
            roles
                .grouping_columns
                .iter()
                .cloned()
                .zip(self.key.iter().cloned())
                .collect(),
        )
    }
}

/// A cleaned series ordered by timestamp.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Series {
    pub timestamps: Vec<NaiveDateTime>,
    pub values: Vec<f64>,
}

impl Series {
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Parsed time axis plus the row partition, computed once per table.
#[derive(Debug, Clone)]
pub struct SeriesFrame {
    timestamps: Vec<Option<NaiveDateTime>>,
    groups: Vec<Group>,
}

impl SeriesFrame {
    pub fn new(table: &Table, roles: &ColumnRoles) -> Result<Self> {
        let time = require_column(table, &roles.time_column)?;
        let timestamps = (0..table.n_rows())
            .map(|row| time.text(row).and_then(parse_timestamp))
            .collect();

        let groups = partition(table, roles)?;

        Ok(Self { timestamps, groups })
    }

    /// Groups sorted by key.
    pub fn groups(&self) -> &[Group] {
        &self.groups
    }

    /// The series of `metric` over the rows of `group`, dropping rows with a
    /// missing timestamp or value.
    pub fn series(&self, table: &Table, metric: &str, group: &Group) -> Result<Series> {
        let column = require_column(table, metric)?;

        let mut points: Vec<(NaiveDateTime, f64)> = group
            .rows
            .iter()
            .filter_map(|&row| Some((self.timestamps[row]?, column.number(row)?)))
            .filter(|(_, v)| !v.is_nan())
            .collect();
        points.sort_by_key(|(ts, _)| *ts);

        let (timestamps, values) = points.into_iter().unzip();
        Ok(Series { timestamps, values })
    }
}

/// Partition rows by their grouping values.
///
/// Rows with a missing value in any grouping column belong to no group.
/// An ungrouped table yields a single group holding every row.
pub fn partition(table: &Table, roles: &ColumnRoles) -> Result<Vec<Group>> {
    if !roles.is_grouped() {
        return Ok(vec![Group {
            key: Vec::new(),
            rows: (0..table.n_rows()).collect(),
        }]);
    }

    let columns: Vec<&Column> = roles
        .grouping_columns
        .iter()
        .map(|name| require_column(table, name))
        .collect::<Result<_>>()?;

    let mut groups: BTreeMap<Vec<String>, Vec<usize>> = BTreeMap::new();
    for row in 0..table.n_rows() {
        let key: Option<Vec<String>> = columns
            .iter()
            .map(|c| c.text(row).map(String::from))
            .collect();
        if let Some(key) = key {
            groups.entry(key).or_default().push(row);
        }
    }

    Ok(groups
        .into_iter()
        .map(|(key, rows)| Group { key, rows })
        .collect())
}

/// Distinct present values of each grouping column, in order of first
/// appearance over the whole table.
pub fn unique_group_values(
    table: &Table,
    roles: &ColumnRoles,
) -> Result<BTreeMap<String, Vec<String>>> {
    let mut out = BTreeMap::new();
    for name in &roles.grouping_columns {
        let column = require_column(table, name)?;
        let mut seen: Vec<String> = Vec::new();
        for row in 0..table.n_rows() {
            if let Some(v) = column.text(row) {
                if !seen.iter().any(|s| s == v) {
                    seen.push(v.to_string());
                }
            }
        }
        out.insert(name.clone(), seen);
    }
    Ok(out)
}

fn require_column<'a>(table: &'a Table, name: &str) -> Result<&'a Column> {
    table
        .column(name)
        .ok_or_else(|| ForecastError::InvalidInput(format!("Unknown column '{}'", name)))
}
