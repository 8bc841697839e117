//! In-memory table loaded from CSV, with per-column types inferred from the
//! cell contents.

use crate::error::{ForecastError, Result};

/// Cell spellings read as missing values.
const MISSING_MARKERS: &[&str] = &[
    "", "#N/A", "#N/A N/A", "#NA", "-1.#IND", "-1.#QNAN", "-NaN", "-nan", "1.#IND", "1.#QNAN",
    "<NA>", "N/A", "NA", "NULL", "NaN", "None", "n/a", "nan", "null",
];

const TRUE_SPELLINGS: &[&str] = &["True", "TRUE", "true"];
const FALSE_SPELLINGS: &[&str] = &["False", "FALSE", "false"];

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// A single cell.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Missing,
    Number(f64),
    Bool(bool),
    Text(String),
}

impl Value {
    pub fn is_missing(&self) -> bool {
        matches!(self, Value::Missing)
    }
}

/// Type of a column, decided once when the table is loaded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    Numeric,
    Boolean,
    Text,
}

/// A named, typed column.
#[derive(Debug, Clone)]
pub struct Column {
    name: String,
    kind: ColumnKind,
    values: Vec<Value>,
}

impl Column {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> ColumnKind {
        self.kind
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }

    /// Text content of the cell at `row`, if it holds text.
    pub fn text(&self, row: usize) -> Option<&str> {
        match self.values.get(row) {
            Some(Value::Text(s)) => Some(s.as_str()),
            _ => None,
        }
    }

    /// Numeric content of the cell at `row`, if it holds a number.
    pub fn number(&self, row: usize) -> Option<f64> {
        match self.values.get(row) {
            Some(Value::Number(v)) => Some(*v),
            _ => None,
        }
    }
}

/// Rows × columns, stored column-wise in the column order of the source.
#[derive(Debug, Clone)]
pub struct Table {
    columns: Vec<Column>,
    n_rows: usize,
}

impl Table {
    /// Parse CSV bytes with a header row.
    pub fn from_csv(bytes: &[u8]) -> Result<Self> {
        let bytes = bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes);

        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(bytes);

        let headers: Vec<String> = reader.headers()?.iter().map(String::from).collect();
        if headers.is_empty() || (headers.len() == 1 && headers[0].is_empty()) {
            return Err(ForecastError::InvalidTable(
                "No columns to parse from file".to_string(),
            ));
        }

        let mut cells: Vec<Vec<Option<String>>> = vec![Vec::new(); headers.len()];
        for (line, record) in reader.records().enumerate() {
            let record = record?;
            if record.len() > headers.len() {
                return Err(ForecastError::InvalidTable(format!(
                    "Expected {} fields in line {}, saw {}",
                    headers.len(),
                    line + 2,
                    record.len()
                )));
            }
            for (i, column) in cells.iter_mut().enumerate() {
                column.push(record.get(i).and_then(normalize_cell));
            }
        }

        let names = dedupe_headers(&headers);
        Ok(Self::from_cells(names.into_iter().zip(cells).collect()))
    }

    /// Build a table from raw string cells, `None` marking a missing value.
    ///
    /// All columns must have the same length.
    pub fn from_cells(columns: Vec<(String, Vec<Option<String>>)>) -> Self {
        let n_rows = columns.first().map(|(_, c)| c.len()).unwrap_or(0);
        let columns = columns
            .into_iter()
            .map(|(name, raw)| {
                let kind = infer_kind(&raw);
                let values = raw
                    .into_iter()
                    .map(|cell| convert_cell(cell, kind))
                    .collect();
                Column { name, kind, values }
            })
            .collect();

        Self { columns, n_rows }
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn n_rows(&self) -> usize {
        self.n_rows
    }

    pub fn n_columns(&self) -> usize {
        self.columns.len()
    }
}

fn normalize_cell(raw: &str) -> Option<String> {
    if MISSING_MARKERS.contains(&raw) {
        None
    } else {
        Some(raw.to_string())
    }
}

/// Empty header cells become `Unnamed: <index>`; repeated names get `.1`,
/// `.2`, ... suffixes in order of appearance.
fn dedupe_headers(headers: &[String]) -> Vec<String> {
    let mut names: Vec<String> = Vec::with_capacity(headers.len());
    for (i, header) in headers.iter().enumerate() {
        let base = if header.is_empty() {
            format!("Unnamed: {}", i)
        } else {
            header.clone()
        };

        let mut candidate = base.clone();
        let mut suffix = 1;
        while names.contains(&candidate) {
            candidate = format!("{}.{}", base, suffix);
            suffix += 1;
        }
        names.push(candidate);
    }
    names
}

fn infer_kind(raw: &[Option<String>]) -> ColumnKind {
    // A header-only file has no evidence either way; treat it as text.
    if raw.is_empty() {
        return ColumnKind::Text;
    }

    let present: Vec<&str> = raw.iter().flatten().map(String::as_str).collect();

    if present.iter().all(|s| parse_number(s).is_some()) {
        return ColumnKind::Numeric;
    }

    if present.len() == raw.len() && present.iter().all(|s| parse_bool(s).is_some()) {
        return ColumnKind::Boolean;
    }

    ColumnKind::Text
}

fn convert_cell(cell: Option<String>, kind: ColumnKind) -> Value {
    let Some(cell) = cell else {
        return Value::Missing;
    };

    match kind {
        ColumnKind::Numeric => parse_number(&cell)
            .map(Value::Number)
            .unwrap_or(Value::Missing),
        ColumnKind::Boolean => parse_bool(&cell).map(Value::Bool).unwrap_or(Value::Missing),
        ColumnKind::Text => Value::Text(cell),
    }
}

fn parse_number(s: &str) -> Option<f64> {
    s.trim().parse::<f64>().ok()
}

fn parse_bool(s: &str) -> Option<bool> {
    if TRUE_SPELLINGS.contains(&s) {
        Some(true)
    } else if FALSE_SPELLINGS.contains(&s) {
        Some(false)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_column_kinds() {
        let csv = "date,region,sales,active\n\
                   2024-01-01,east,10,true\n\
                   2024-01-02,west,12.5,False\n";
        let table = Table::from_csv(csv.as_bytes()).unwrap();

        assert_eq!(table.n_rows(), 2);
        assert_eq!(table.n_columns(), 4);
        let kinds: Vec<ColumnKind> = table.columns().iter().map(|c| c.kind()).collect();
        assert_eq!(
            kinds,
            vec![
                ColumnKind::Text,
                ColumnKind::Text,
                ColumnKind::Numeric,
                ColumnKind::Boolean
            ]
        );
        assert_eq!(table.column("sales").unwrap().number(1), Some(12.5));
        assert_eq!(table.column("region").unwrap().text(0), Some("east"));
    }

    #[test]
    fn test_missing_markers() {
        let csv = "date,sales,label\n2024-01-01,NA,x\n2024-01-02,,null\n2024-01-03,3,y\n";
        let table = Table::from_csv(csv.as_bytes()).unwrap();

        let sales = table.column("sales").unwrap();
        assert_eq!(sales.kind(), ColumnKind::Numeric);
        assert!(sales.values()[0].is_missing());
        assert!(sales.values()[1].is_missing());
        assert_eq!(sales.number(2), Some(3.0));

        let label = table.column("label").unwrap();
        assert_eq!(label.kind(), ColumnKind::Text);
        assert!(label.values()[1].is_missing());
    }

    #[test]
    fn test_all_missing_column_is_numeric() {
        let csv = "date,empty\n2024-01-01,\n2024-01-02,NaN\n";
        let table = Table::from_csv(csv.as_bytes()).unwrap();
        assert_eq!(table.column("empty").unwrap().kind(), ColumnKind::Numeric);
    }

    #[test]
    fn test_boolean_with_missing_is_text() {
        let csv = "flag,n\ntrue,1\nfalse,2\n";
        let table = Table::from_csv(csv.as_bytes()).unwrap();
        assert_eq!(table.column("flag").unwrap().kind(), ColumnKind::Boolean);

        let csv = "flag,n\ntrue,1\nNA,2\nfalse,3\n";
        let table = Table::from_csv(csv.as_bytes()).unwrap();
        assert_eq!(table.column("flag").unwrap().kind(), ColumnKind::Text);
    }

    #[test]
    fn test_duplicate_and_empty_headers() {
        let csv = "a,a,,a\n1,2,3,4\n";
        let table = Table::from_csv(csv.as_bytes()).unwrap();
        let names: Vec<&str> = table.columns().iter().map(|c| c.name()).collect();
        assert_eq!(names, vec!["a", "a.1", "Unnamed: 2", "a.2"]);
    }

    #[test]
    fn test_short_rows_are_padded() {
        let csv = "date,sales\n2024-01-01\n2024-01-02,5\n";
        let table = Table::from_csv(csv.as_bytes()).unwrap();
        let sales = table.column("sales").unwrap();
        assert!(sales.values()[0].is_missing());
        assert_eq!(sales.number(1), Some(5.0));
    }

    #[test]
    fn test_long_rows_fail() {
        let csv = "date,sales\n2024-01-01,5,7\n";
        let err = Table::from_csv(csv.as_bytes()).unwrap_err();
        assert!(matches!(err, ForecastError::InvalidTable(_)));
        assert!(err.to_string().contains("Expected 2 fields in line 2, saw 3"));
    }

    #[test]
    fn test_empty_input_fails() {
        let err = Table::from_csv(b"").unwrap_err();
        assert!(matches!(err, ForecastError::InvalidTable(_)));
    }

    #[test]
    fn test_bom_is_stripped() {
        let csv = b"\xEF\xBB\xBFdate,sales\n2024-01-01,1\n";
        let table = Table::from_csv(csv).unwrap();
        assert!(table.column("date").is_some());
    }

    #[test]
    fn test_header_only_columns_are_text() {
        let table = Table::from_csv(b"date,sales\n").unwrap();
        assert_eq!(table.n_rows(), 0);
        assert!(table
            .columns()
            .iter()
            .all(|c| c.kind() == ColumnKind::Text));
    }
}
