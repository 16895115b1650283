//! CSV reader for spreadsheet exports using pest.
//!
//! The first record is the header. Blank lines are skipped, short records are
//! padded with empty fields and a record wider than the header is an error.
//! Column types are inferred afterwards: a column whose non-empty cells all
//! parse as numbers becomes numeric, anything else stays text.

use pest::iterators::Pair;
use pest::Parser;
use pest_derive::Parser;
use std::collections::HashSet;
use tracing::trace;

use labdash_core::{CellValue, Table};

use crate::ParseError;

#[derive(Parser)]
#[grammar = "csv/grammar.pest"]
pub struct CsvParser;

/// Header plus string records, before any type inference
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RawTable {
    pub headers: Vec<String>,
    pub records: Vec<Vec<String>>,
}

/// Parse CSV text into header and records
pub fn parse(input: &str) -> Result<RawTable, ParseError> {
    let input = input.strip_prefix('\u{feff}').unwrap_or(input);

    let mut pairs = CsvParser::parse(Rule::file, input).map_err(|e| {
        let (line, column) = match e.line_col {
            pest::error::LineColLocation::Pos((l, c)) => (l, c),
            pest::error::LineColLocation::Span((l, c), _) => (l, c),
        };
        ParseError::Syntax {
            line,
            column,
            message: e.variant.message().to_string(),
        }
    })?;

    let mut records = Vec::new();
    if let Some(file) = pairs.next() {
        for pair in file.into_inner() {
            if pair.as_rule() != Rule::record {
                continue;
            }
            let line = pair.line_col().0;
            let fields: Vec<String> = pair.into_inner().map(field_value).collect();
            if fields.iter().all(String::is_empty) && fields.len() == 1 {
                trace!(line, "blank line skipped");
                continue;
            }
            records.push((line, fields));
        }
    }

    let mut records = records.into_iter();
    let (_, header) = records.next().ok_or(ParseError::MissingHeader)?;
    let headers = dedupe_headers(header);

    let width = headers.len();
    let mut rows = Vec::new();
    for (line, mut fields) in records {
        if fields.len() > width {
            return Err(ParseError::RaggedRecord {
                line,
                expected: width,
                found: fields.len(),
            });
        }
        fields.resize(width, String::new());
        rows.push(fields);
    }

    Ok(RawTable {
        headers,
        records: rows,
    })
}

/// Parse CSV text and infer column types
pub fn parse_table(input: &str) -> Result<Table, ParseError> {
    parse(input)?.into_table()
}

fn field_value(pair: Pair<Rule>) -> String {
    match pair.as_rule() {
        Rule::quoted => pair
            .into_inner()
            .next()
            .map(|inner| inner.as_str().replace("\"\"", "\""))
            .unwrap_or_default(),
        _ => pair.as_str().to_string(),
    }
}

/// Blank names become `Unnamed: i`, repeated names get `.1`, `.2`, ...
fn dedupe_headers(header: Vec<String>) -> Vec<String> {
    let mut seen: HashSet<String> = HashSet::new();
    header
        .into_iter()
        .enumerate()
        .map(|(i, name)| {
            let base = if name.trim().is_empty() {
                format!("Unnamed: {i}")
            } else {
                name
            };
            let mut candidate = base.clone();
            let mut suffix = 1;
            while seen.contains(&candidate) {
                candidate = format!("{base}.{suffix}");
                suffix += 1;
            }
            seen.insert(candidate.clone());
            candidate
        })
        .collect()
}

fn numeric(raw: &str) -> Option<f64> {
    raw.trim().parse::<f64>().ok().filter(|n| n.is_finite())
}

impl RawTable {
    /// Convert to a typed table; empty fields become missing cells
    pub fn into_table(self) -> Result<Table, ParseError> {
        let numeric_columns: Vec<bool> = (0..self.headers.len())
            .map(|col| {
                self.records
                    .iter()
                    .map(|record| record[col].as_str())
                    .filter(|cell| !cell.is_empty())
                    .all(|cell| numeric(cell).is_some())
            })
            .collect();

        let rows = self
            .records
            .into_iter()
            .map(|record| {
                record
                    .into_iter()
                    .zip(&numeric_columns)
                    .map(|(cell, &is_numeric)| {
                        if cell.is_empty() {
                            CellValue::Missing
                        } else if is_numeric {
                            numeric(&cell).map_or(CellValue::Text(cell), CellValue::Number)
                        } else {
                            CellValue::Text(cell)
                        }
                    })
                    .collect()
            })
            .collect();

        Ok(Table::from_rows(self.headers, rows)?)
    }
}
