//! # labdash-core
//!
//! Domain model and derivation pipeline for the labdash laboratory dashboard.
//!
//! This crate provides:
//! - Domain types: `CellValue`, `Table`, `FilterSelection`, `TimelineRow`
//! - Pipeline stages: normalize, facet index, filter, metrics, timeline,
//!   column visibility, chart breakdowns
//! - Core traits: `DataSource`, `Renderer`
//! - Error types
//!
//! ## Example
//!
//! ```rust
//! use labdash_core::{CellValue, Table};
//! use labdash_core::filter::{apply_filters, FilterSelection};
//! use labdash_core::facet::FacetSpec;
//!
//! let table = Table::from_rows(
//!     vec!["Matriz".into(), "Qtdade".into()],
//!     vec![
//!         vec![CellValue::text("Água"), CellValue::Number(3.0)],
//!         vec![CellValue::text("Solo"), CellValue::Number(5.0)],
//!     ],
//! )
//! .unwrap();
//!
//! let facets = vec![FacetSpec::column("Matriz")];
//! let selection = FilterSelection::new().select("Matriz", ["Solo"]);
//! let filtered = apply_filters(&table, &facets, &selection);
//! assert_eq!(filtered.len(), 1);
//! ```

pub mod charts;
pub mod config;
pub mod dashboard;
pub mod facet;
pub mod filter;
pub mod metrics;
pub mod normalize;
pub mod timeline;
pub mod visibility;

pub use config::DashboardConfig;
pub use dashboard::{Dashboard, DashboardRequest, DashboardView};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::HashSet;
use std::fmt;
use thiserror::Error;

// ============================================================================
// Cell Values
// ============================================================================

/// A single typed cell of the sample register
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum CellValue {
    /// Empty or unparseable cell
    Missing,
    /// Free text
    Text(String),
    /// Numeric value
    Number(f64),
    /// Calendar date (after normalization)
    Date(NaiveDate),
}

static MISSING: CellValue = CellValue::Missing;

impl CellValue {
    /// Create a text cell
    pub fn text(value: impl Into<String>) -> Self {
        CellValue::Text(value.into())
    }

    pub fn is_missing(&self) -> bool {
        matches!(self, CellValue::Missing)
    }

    /// Canonical display key, used for facet options and filter membership.
    ///
    /// Integral numbers drop their decimals, dates render as ISO `YYYY-MM-DD`.
    /// Missing cells have no key.
    pub fn key(&self) -> Option<String> {
        match self {
            CellValue::Missing => None,
            CellValue::Text(s) => Some(s.clone()),
            CellValue::Number(n) => Some(format_number(*n)),
            CellValue::Date(d) => Some(d.format("%Y-%m-%d").to_string()),
        }
    }

    /// Numeric reading of the cell.
    ///
    /// Text cells are accepted when they parse as a number, including a
    /// decimal comma.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            CellValue::Number(n) => Some(*n),
            CellValue::Text(s) => parse_number(s),
            CellValue::Missing | CellValue::Date(_) => None,
        }
    }

    pub fn as_date(&self) -> Option<NaiveDate> {
        match self {
            CellValue::Date(d) => Some(*d),
            CellValue::Missing | CellValue::Text(_) | CellValue::Number(_) => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            CellValue::Text(s) => Some(s.as_str()),
            CellValue::Missing | CellValue::Number(_) | CellValue::Date(_) => None,
        }
    }

    /// Natural ordering: missing first, then numbers, text, dates.
    pub fn natural_cmp(&self, other: &CellValue) -> Ordering {
        fn rank(value: &CellValue) -> u8 {
            match value {
                CellValue::Missing => 0,
                CellValue::Number(_) => 1,
                CellValue::Text(_) => 2,
                CellValue::Date(_) => 3,
            }
        }

        match (self, other) {
            (CellValue::Number(a), CellValue::Number(b)) => a.total_cmp(b),
            (CellValue::Text(a), CellValue::Text(b)) => a.cmp(b),
            (CellValue::Date(a), CellValue::Date(b)) => a.cmp(b),
            _ => rank(self).cmp(&rank(other)),
        }
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Missing => Ok(()),
            CellValue::Text(s) => write!(f, "{}", s),
            CellValue::Number(n) => write!(f, "{}", format_number(*n)),
            CellValue::Date(d) => write!(f, "{}", d.format("%d/%m/%Y")),
        }
    }
}

/// Format a number without a trailing `.0` for integral values
pub fn format_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{}", value)
    }
}

/// Parse a numeric cell, accepting a decimal comma (`12,5`).
///
/// Returns `None` for blank, non-numeric or non-finite input.
pub fn parse_number(raw: &str) -> Option<f64> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }
    let parsed = s.parse::<f64>().ok().or_else(|| {
        if s.contains(',') && !s.contains('.') && s.matches(',').count() == 1 {
            s.replace(',', ".").parse::<f64>().ok()
        } else {
            None
        }
    });
    parsed.filter(|n| n.is_finite())
}

// ============================================================================
// Table
// ============================================================================

/// An immutable, rectangular snapshot of the sample register.
///
/// Every row holds exactly one cell per column. Pipeline stages never mutate
/// a table in place; they build a new one.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Table {
    columns: Vec<String>,
    rows: Vec<Vec<CellValue>>,
}

impl Table {
    /// Create an empty table with the given columns
    pub fn new(columns: Vec<String>) -> Result<Self, TableError> {
        let mut seen = HashSet::new();
        for column in &columns {
            if !seen.insert(column.as_str()) {
                return Err(TableError::DuplicateColumn(column.clone()));
            }
        }
        Ok(Self {
            columns,
            rows: Vec::new(),
        })
    }

    /// Create a table from columns and rows, checking the rectangular shape
    pub fn from_rows(columns: Vec<String>, rows: Vec<Vec<CellValue>>) -> Result<Self, TableError> {
        let mut table = Self::new(columns)?;
        for row in rows {
            table.push_row(row)?;
        }
        Ok(table)
    }

    /// Append a row while the table is being built
    pub fn push_row(&mut self, row: Vec<CellValue>) -> Result<(), TableError> {
        if row.len() != self.columns.len() {
            return Err(TableError::RaggedRow {
                row: self.rows.len(),
                expected: self.columns.len(),
                found: row.len(),
            });
        }
        self.rows.push(row);
        Ok(())
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Position of a column by exact name
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column_index(name).is_some()
    }

    /// Positions of the named columns that exist, in the given order
    pub fn existing_indices<S: AsRef<str>>(&self, names: &[S]) -> Vec<usize> {
        names
            .iter()
            .filter_map(|name| self.column_index(name.as_ref()))
            .collect()
    }

    /// Iterate over rows
    pub fn rows(&self) -> impl Iterator<Item = Row<'_>> {
        self.rows.iter().enumerate().map(move |(index, cells)| Row {
            table: self,
            index,
            cells,
        })
    }

    /// Get a row by position
    pub fn row(&self, index: usize) -> Option<Row<'_>> {
        self.rows.get(index).map(|cells| Row {
            table: self,
            index,
            cells,
        })
    }

    /// All cells of a column, or `None` if the column does not exist
    pub fn column(&self, name: &str) -> Option<impl Iterator<Item = &CellValue>> {
        let index = self.column_index(name)?;
        Some(self.rows.iter().map(move |row| &row[index]))
    }

    /// Build a new table keeping the rows accepted by `keep`, in order
    pub fn filter_rows<F>(&self, mut keep: F) -> Table
    where
        F: FnMut(&Row<'_>) -> bool,
    {
        let rows = self
            .rows()
            .filter(|row| keep(row))
            .map(|row| row.cells.to_vec())
            .collect();
        Table {
            columns: self.columns.clone(),
            rows,
        }
    }

    /// Build a new table with only the columns at `indices`, in that order
    pub fn select_columns(&self, indices: &[usize]) -> Table {
        let columns = indices.iter().map(|&i| self.columns[i].clone()).collect();
        let rows = self
            .rows
            .iter()
            .map(|row| indices.iter().map(|&i| row[i].clone()).collect())
            .collect();
        Table { columns, rows }
    }

    /// Build a new table with only the named columns that exist
    pub fn project<S: AsRef<str>>(&self, names: &[S]) -> Table {
        self.select_columns(&self.existing_indices(names))
    }

    /// Build a new table with every cell of one column rewritten by `f`
    pub fn map_column<F>(&self, index: usize, mut f: F) -> Table
    where
        F: FnMut(&CellValue) -> CellValue,
    {
        let rows = self
            .rows
            .iter()
            .map(|row| {
                let mut row = row.clone();
                row[index] = f(&row[index]);
                row
            })
            .collect();
        Table {
            columns: self.columns.clone(),
            rows,
        }
    }
}

/// Borrowed view of one table row
#[derive(Clone, Copy, Debug)]
pub struct Row<'a> {
    table: &'a Table,
    index: usize,
    cells: &'a [CellValue],
}

impl<'a> Row<'a> {
    /// Zero-based position in the owning table
    pub fn index(&self) -> usize {
        self.index
    }

    /// Cell by column name; absent columns read as missing
    pub fn get(&self, column: &str) -> &'a CellValue {
        self.table
            .column_index(column)
            .map(|i| &self.cells[i])
            .unwrap_or(&MISSING)
    }

    /// Cell by column position
    pub fn at(&self, index: usize) -> &'a CellValue {
        self.cells.get(index).unwrap_or(&MISSING)
    }

    pub fn cells(&self) -> &'a [CellValue] {
        self.cells
    }
}

// ============================================================================
// Core Traits
// ============================================================================

/// A provider of raw CSV bytes for the sample register
pub trait DataSource: Send + Sync {
    /// Short human-readable description (path or URL)
    fn describe(&self) -> String;

    /// Fetch the raw tabular bytes
    fn fetch(&self) -> Result<Vec<u8>, FetchError>;
}

impl<T: DataSource + ?Sized> DataSource for Box<T> {
    fn describe(&self) -> String {
        (**self).describe()
    }

    fn fetch(&self) -> Result<Vec<u8>, FetchError> {
        (**self).fetch()
    }
}

/// Output generator for a derived dashboard view
pub trait Renderer {
    type Output;

    fn render(&self, view: &DashboardView) -> Result<Self::Output, RenderError>;
}

// ============================================================================
// Errors
// ============================================================================

/// The data source could not deliver a usable table
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Data source unreachable: {0}")]
    Network(String),

    #[error("Data source answered with HTTP status {status}")]
    Status { status: u16 },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Malformed data: {0}")]
    Malformed(String),

    #[error("Data source returned no data")]
    Empty,
}

/// A single cell failed type coercion; recovered as missing
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CellParseError {
    #[error("Invalid date: {0:?}")]
    InvalidDate(String),

    #[error("Not a date cell: {0}")]
    NotADate(String),
}

/// A table was built with an invalid shape
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TableError {
    #[error("Duplicate column: {0}")]
    DuplicateColumn(String),

    #[error("Row {row} has {found} cells, expected {expected}")]
    RaggedRow {
        row: usize,
        expected: usize,
        found: usize,
    },
}

/// Configuration values that cannot drive a derivation pass
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("Invalid config value for {field}: {reason}")]
    InvalidValue { field: String, reason: String },
}

/// Rendering error
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Format error: {0}")]
    Format(String),

    #[error("Invalid data: {0}")]
    InvalidData(String),
}

// ============================================================================
// Tests
// ============================================================================
