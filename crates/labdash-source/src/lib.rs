//! # labdash-source
//!
//! Getting the sample register into a [`Table`].
//!
//! This crate provides:
//! - A CSV reader built on a pest grammar
//! - File, HTTP and published-spreadsheet data sources
//! - A TTL cache handing out shared table snapshots
//!
//! ## Example
//!
//! ```rust
//! use labdash_source::parse_csv;
//!
//! let table = parse_csv("Boletim,Qtdade\nB-01,3\nB-02,\n").unwrap();
//! assert_eq!(table.len(), 2);
//! assert_eq!(table.columns(), &["Boletim".to_string(), "Qtdade".to_string()]);
//! ```

pub mod csv;
pub mod source;

pub use source::{
    load_table, open_location, table_from_bytes, CachedSource, FileSource, HttpSource, SheetExport,
};

use labdash_core::{FetchError, Table, TableError};
use thiserror::Error;

/// CSV parsing error
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("Syntax error at line {line}, column {column}: {message}")]
    Syntax {
        line: usize,
        column: usize,
        message: String,
    },

    #[error("Record at line {line} has {found} fields, header has {expected}")]
    RaggedRecord {
        line: usize,
        expected: usize,
        found: usize,
    },

    #[error("No header row")]
    MissingHeader,

    #[error(transparent)]
    Table(#[from] TableError),
}

impl From<ParseError> for FetchError {
    fn from(err: ParseError) -> Self {
        Self::Malformed(err.to_string())
    }
}

/// Parse CSV text into a typed table
pub fn parse_csv(input: &str) -> Result<Table, ParseError> {
    csv::parse_table(input)
}

/// Read and parse a CSV file
pub fn parse_file(path: &std::path::Path) -> Result<Table, FetchError> {
    load_table(&FileSource::new(path))
}
