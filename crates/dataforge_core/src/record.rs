//! The normalized table every format reader converges on.

use serde::{Deserialize, Serialize};

/// Label used for generated column headers: `Column_1`, `Column_2`, ...
///
/// `index` is zero-based.
pub fn synthetic_header(index: usize) -> String {
    format!("Column_{}", index + 1)
}

/// Ordered column labels plus ordered rows of string cells.
///
/// Constructors pad ragged rows with empty strings so that every row is as
/// wide as `columns`. The one exception is [`TabularRecord::from_mapping`],
/// which keeps the one-cell-per-key shape produced by a bare JSON object;
/// [`TabularRecord::is_rectangular`] tells the two apart.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TabularRecord {
    columns: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl TabularRecord {
    /// The "no data" record: zero columns, zero rows.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build a record from a header and rows.
    ///
    /// Rows shorter than the widest line are right-padded with `""`. When a
    /// row is wider than the header, the header is extended with synthetic
    /// labels for the extra positions.
    pub fn new(mut columns: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        let width = max_width(&rows).max(columns.len());
        for index in columns.len()..width {
            columns.push(synthetic_header(index));
        }
        Self {
            columns,
            rows: pad_rows(rows, width),
        }
    }

    /// Build a record whose headers are `Column_1..Column_N`, N being the
    /// widest row.
    pub fn with_synthetic_headers(rows: Vec<Vec<String>>) -> Self {
        let width = max_width(&rows);
        Self {
            columns: (0..width).map(synthetic_header).collect(),
            rows: pad_rows(rows, width),
        }
    }

    /// Build the key/value shape: one column per key and one single-cell row
    /// per key holding that key's value.
    pub fn from_mapping(entries: Vec<(String, String)>) -> Self {
        let (columns, rows) = entries
            .into_iter()
            .map(|(key, value)| (key, vec![value]))
            .unzip();
        Self { columns, rows }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// True when there is nothing to tabulate (no columns or no rows).
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty() || self.rows.is_empty()
    }

    /// True when every row has exactly `column_count()` cells.
    pub fn is_rectangular(&self) -> bool {
        self.rows.iter().all(|row| row.len() == self.columns.len())
    }

    /// Cell text at (`row`, `column`), or `""` when the row is shorter.
    pub fn cell(&self, row: usize, column: usize) -> &str {
        self.rows
            .get(row)
            .and_then(|cells| cells.get(column))
            .map(String::as_str)
            .unwrap_or("")
    }

    pub fn into_parts(self) -> (Vec<String>, Vec<Vec<String>>) {
        (self.columns, self.rows)
    }
}

fn max_width(rows: &[Vec<String>]) -> usize {
    rows.iter().map(Vec::len).max().unwrap_or(0)
}

fn pad_rows(rows: Vec<Vec<String>>, width: usize) -> Vec<Vec<String>> {
    rows.into_iter()
        .map(|mut row| {
            row.resize(width, String::new());
            row
        })
        .collect()
}
