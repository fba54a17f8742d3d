//! Tabular containers.
//!
//! - [`WideTable`] - header row + string cells, one row per entity
//! - [`RawGrid`] - header-less, possibly ragged cell grid
//! - [`Frame`] - column-ordered output table (name → values)

use serde::ser::{Serialize, SerializeMap, Serializer};
use serde_json::Value;
use std::collections::HashSet;

use crate::error::{CsvError, CsvResult, TransformError, TransformResult};

/// Coerce a cell to a non-negative integer count.
///
/// Accepts `"48"`, `" 48 "`, `"48.0"` and `"1,024"`. Empty, negative,
/// fractional and non-numeric cells yield `None`.
pub fn parse_count(cell: &str) -> Option<u64> {
    let cleaned: String = cell.trim().chars().filter(|c| *c != ',').collect();
    if cleaned.is_empty() {
        return None;
    }

    if let Ok(n) = cleaned.parse::<u64>() {
        return Some(n);
    }

    match cleaned.parse::<f64>() {
        Ok(f) if f.is_finite() && f >= 0.0 && f.fract() == 0.0 && f <= u64::MAX as f64 => {
            Some(f as u64)
        }
        _ => None,
    }
}

// =============================================================================
// WideTable
// =============================================================================

/// A table with unique column names and one row per entity.
///
/// Every row has exactly `headers.len()` cells.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WideTable {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl WideTable {
    /// Build a table, padding short rows and truncating long ones.
    pub fn new(headers: Vec<String>, rows: Vec<Vec<String>>) -> CsvResult<Self> {
        let mut seen = HashSet::new();
        for header in &headers {
            if !seen.insert(header.as_str()) {
                return Err(CsvError::DuplicateColumn(header.clone()));
            }
        }

        let width = headers.len();
        let rows = rows
            .into_iter()
            .map(|mut row| {
                row.resize(width, String::new());
                row
            })
            .collect();

        Ok(Self { headers, rows })
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    /// Index of `name`, or [`TransformError::MissingColumn`].
    pub fn require_column(&self, name: &str) -> TransformResult<usize> {
        self.column_index(name)
            .ok_or_else(|| TransformError::MissingColumn(name.to_string()))
    }

    /// Saturating sum of a column, treating malformed cells as 0.
    pub fn column_sum(&self, name: &str) -> TransformResult<u64> {
        let idx = self.require_column(name)?;
        Ok(self
            .rows
            .iter()
            .map(|row| parse_count(&row[idx]).unwrap_or(0))
            .fold(0, u64::saturating_add))
    }

    /// Copy of the table without the columns matching `drop`.
    pub fn without_columns<F>(&self, drop: F) -> Self
    where
        F: Fn(&str) -> bool,
    {
        let keep: Vec<usize> = self
            .headers
            .iter()
            .enumerate()
            .filter(|(_, h)| !drop(h))
            .map(|(i, _)| i)
            .collect();

        Self {
            headers: keep.iter().map(|&i| self.headers[i].clone()).collect(),
            rows: self
                .rows
                .iter()
                .map(|row| keep.iter().map(|&i| row[i].clone()).collect())
                .collect(),
        }
    }

    /// Copy of the table keeping only rows accepted by `keep`.
    pub fn filter_rows<F>(&self, keep: F) -> Self
    where
        F: Fn(&[String]) -> bool,
    {
        Self {
            headers: self.headers.clone(),
            rows: self.rows.iter().filter(|r| keep(r)).cloned().collect(),
        }
    }

    /// Column-ordered view; cells that look like counts become numbers.
    pub fn to_frame(&self) -> Frame {
        self.headers
            .iter()
            .enumerate()
            .fold(Frame::new(), |frame, (idx, name)| {
                let values = self
                    .rows
                    .iter()
                    .map(|row| match parse_count(&row[idx]) {
                        Some(n) => Value::from(n),
                        None => Value::from(row[idx].clone()),
                    })
                    .collect();
                frame.with_column(name, values)
            })
    }
}

// =============================================================================
// RawGrid
// =============================================================================

/// A header-less grid of cells. Rows may have different lengths.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawGrid {
    rows: Vec<Vec<String>>,
}

impl RawGrid {
    pub fn new(rows: Vec<Vec<String>>) -> Self {
        Self { rows }
    }

    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Width of the widest row.
    pub fn width(&self) -> usize {
        self.rows.iter().map(Vec::len).max().unwrap_or(0)
    }

    /// Cell at `(row, col)`; missing cells read as empty.
    pub fn cell(&self, row: usize, col: usize) -> &str {
        self.rows
            .get(row)
            .and_then(|r| r.get(col))
            .map(String::as_str)
            .unwrap_or("")
    }

    /// Write a cell, growing the grid as needed.
    pub fn set(&mut self, row: usize, col: usize, value: impl Into<String>) {
        if self.rows.len() <= row {
            self.rows.resize(row + 1, Vec::new());
        }
        let cells = &mut self.rows[row];
        if cells.len() <= col {
            cells.resize(col + 1, String::new());
        }
        cells[col] = value.into();
    }

    /// Render as comma-separated text, every row padded to the full width.
    pub fn to_csv(&self) -> CsvResult<String> {
        let width = self.width();
        let mut writer = csv::WriterBuilder::new().from_writer(Vec::new());
        for row in &self.rows {
            let mut padded = row.clone();
            padded.resize(width, String::new());
            writer.write_record(&padded)?;
        }
        let bytes = writer
            .into_inner()
            .map_err(|e| CsvError::EncodingError(e.to_string()))?;
        String::from_utf8(bytes).map_err(|e| CsvError::EncodingError(e.to_string()))
    }
}

// =============================================================================
// Frame
// =============================================================================

/// Column-ordered table: every column has the same number of values.
///
/// Serializes as a JSON object `{ "<column>": [values...] }` with keys in
/// column order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Frame {
    columns: Vec<(String, Vec<Value>)>,
}

impl Frame {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a column. All columns must have the same length.
    pub fn with_column(mut self, name: impl Into<String>, values: Vec<Value>) -> Self {
        debug_assert!(
            self.columns.first().map_or(true, |(_, v)| v.len() == values.len()),
            "frame columns must have equal length"
        );
        self.columns.push((name.into(), values));
        self
    }

    pub fn names(&self) -> Vec<&str> {
        self.columns.iter().map(|(n, _)| n.as_str()).collect()
    }

    pub fn column(&self, name: &str) -> Option<&[Value]> {
        self.columns
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_slice())
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.columns.first().map_or(0, |(_, v)| v.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Serialize for Frame {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.columns.len()))?;
        for (name, values) in &self.columns {
            map.serialize_entry(name, values)?;
        }
        map.end()
    }
}
