//! Schema normalization
//!
//! Coerces date-like columns to `CellValue::Date` using a day-first
//! convention and applies the configured row/column drop policy. Bad cells
//! become missing; normalization never fails as a whole.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::{CellParseError, CellValue, Table};

/// Which structurally empty parts of the table are dropped
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum RowDropPolicy {
    /// Drop every column whose cells are all missing
    DropEmptyColumns,
    /// Drop every row whose key columns are all missing
    DropRowsMissingKeys { key_columns: Vec<String> },
}

impl Default for RowDropPolicy {
    fn default() -> Self {
        RowDropPolicy::DropEmptyColumns
    }
}

/// Normalization settings
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NormalizeOptions {
    /// Columns parsed as day-first dates
    pub date_columns: Vec<String>,
    /// Structural drop policy
    pub drop_policy: RowDropPolicy,
}

impl Default for NormalizeOptions {
    fn default() -> Self {
        Self {
            date_columns: vec![
                "Data".into(),
                "Prazo Técnico 1".into(),
                "Prazo Técnico 2".into(),
                "Prazo Técnico 3".into(),
            ],
            drop_policy: RowDropPolicy::default(),
        }
    }
}

impl NormalizeOptions {
    /// Add date columns not already listed
    pub fn with_date_columns<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for column in columns {
            let column = column.into();
            if !self.date_columns.contains(&column) {
                self.date_columns.push(column);
            }
        }
        self
    }
}

/// Normalize a raw table snapshot into a new table.
///
/// The drop policy looks at the raw cells, so a date column whose values all
/// fail to parse is kept (as all missing) rather than dropped.
pub fn normalize(raw: &Table, options: &NormalizeOptions) -> Table {
    let mut table = match &options.drop_policy {
        RowDropPolicy::DropEmptyColumns => drop_empty_columns(raw),
        RowDropPolicy::DropRowsMissingKeys { key_columns } => {
            drop_rows_missing_keys(raw, key_columns)
        }
    };

    for column in &options.date_columns {
        let Some(index) = table.column_index(column) else {
            debug!(column = %column, "date column not present, skipping");
            continue;
        };
        table = table.map_column(index, |cell| coerce_date(cell, column));
    }
    table
}

fn coerce_date(cell: &CellValue, column: &str) -> CellValue {
    let parsed = match cell {
        CellValue::Missing => return CellValue::Missing,
        CellValue::Date(d) => Ok(*d),
        CellValue::Text(s) => parse_day_first(s),
        CellValue::Number(n) => Err(CellParseError::NotADate(crate::format_number(*n))),
    };
    match parsed {
        Ok(date) => CellValue::Date(date),
        Err(err) => {
            trace!(column = %column, error = %err, "cell coerced to missing");
            CellValue::Missing
        }
    }
}

fn drop_empty_columns(table: &Table) -> Table {
    if table.is_empty() {
        return table.clone();
    }
    let keep: Vec<usize> = (0..table.columns().len())
        .filter(|&i| table.rows().any(|row| !row.at(i).is_missing()))
        .collect();
    if keep.len() < table.columns().len() {
        debug!(
            dropped = table.columns().len() - keep.len(),
            "dropped entirely empty columns"
        );
    }
    table.select_columns(&keep)
}

fn drop_rows_missing_keys(table: &Table, key_columns: &[String]) -> Table {
    let keys = table.existing_indices(key_columns);
    if keys.is_empty() {
        debug!(?key_columns, "no key column present, row drop skipped");
        return table.clone();
    }
    let kept = table.filter_rows(|row| keys.iter().any(|&i| !row.at(i).is_missing()));
    if kept.len() < table.len() {
        debug!(dropped = table.len() - kept.len(), "dropped rows without keys");
    }
    kept
}

/// Parse a day-first date such as `05/01/2024`, `5-1-24` or `05.01.2024 14:30`.
///
/// ISO `2024-01-05` is accepted as well. A trailing time of day is ignored.
pub fn parse_day_first(text: &str) -> Result<NaiveDate, CellParseError> {
    let invalid = || CellParseError::InvalidDate(text.to_string());

    let date_part = text
        .trim()
        .split(|c: char| c.is_whitespace() || c == 'T')
        .next()
        .filter(|s| !s.is_empty())
        .ok_or_else(invalid)?;

    let parts: Vec<&str> = date_part.split(['/', '-', '.']).collect();
    if parts.len() != 3 || parts.iter().any(|p| p.is_empty() || !p.chars().all(|c| c.is_ascii_digit())) {
        return Err(invalid());
    }

    let (year, month, day) = if parts[0].len() == 4 {
        (parts[0], parts[1], parts[2])
    } else {
        (parts[2], parts[1], parts[0])
    };

    let mut year: i32 = year.parse().map_err(|_| invalid())?;
    if parts[2].len() == 2 && parts[0].len() != 4 {
        year += if year < 70 { 2000 } else { 1900 };
    } else if year < 1000 {
        return Err(invalid());
    }
    let month: u32 = month.parse().map_err(|_| invalid())?;
    let day: u32 = day.parse().map_err(|_| invalid())?;

    NaiveDate::from_ymd_opt(year, month, day).ok_or_else(invalid)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn date(year: i32, month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, day).unwrap()
    }

    fn raw_table() -> Table {
        Table::from_rows(
            vec!["Boletim".into(), "Data".into(), "Status_Amostra".into(), "Vazia".into()],
            vec![
                vec![
                    CellValue::text("B-01"),
                    CellValue::text("05/01/2024"),
                    CellValue::text("PRONTAS"),
                    CellValue::Missing,
                ],
                vec![
                    CellValue::text("B-02"),
                    CellValue::text("not a date"),
                    CellValue::Missing,
                    CellValue::Missing,
                ],
                vec![
                    CellValue::Missing,
                    CellValue::text("31/12/2023"),
                    CellValue::Missing,
                    CellValue::Missing,
                ],
            ],
        )
        .unwrap()
    }

    #[test]
    fn parses_day_first_formats() {
        assert_eq!(parse_day_first("05/01/2024").unwrap(), date(2024, 1, 5));
        assert_eq!(parse_day_first("5-1-24").unwrap(), date(2024, 1, 5));
        assert_eq!(parse_day_first("05.01.2024 14:30:00").unwrap(), date(2024, 1, 5));
        assert_eq!(parse_day_first("2024-01-05").unwrap(), date(2024, 1, 5));
        assert_eq!(parse_day_first("2024-01-05T08:00:00").unwrap(), date(2024, 1, 5));
        assert_eq!(parse_day_first("01/02/99").unwrap(), date(1999, 2, 1));
    }

    #[test]
    fn rejects_invalid_dates() {
        assert!(parse_day_first("31/02/2024").is_err());
        assert!(parse_day_first("hello").is_err());
        assert!(parse_day_first("").is_err());
        assert!(parse_day_first("12/2024").is_err());
        assert!(parse_day_first("05/01/024").is_err());
    }

    #[test]
    fn bad_date_cells_become_missing() {
        let options = NormalizeOptions {
            date_columns: vec!["Data".into()],
            drop_policy: RowDropPolicy::DropEmptyColumns,
        };
        let table = normalize(&raw_table(), &options);
        let dates: Vec<_> = table.column("Data").unwrap().cloned().collect();
        assert_eq!(
            dates,
            vec![
                CellValue::Date(date(2024, 1, 5)),
                CellValue::Missing,
                CellValue::Date(date(2023, 12, 31)),
            ]
        );
    }

    #[test]
    fn drop_empty_columns_policy() {
        let options = NormalizeOptions {
            date_columns: vec![],
            drop_policy: RowDropPolicy::DropEmptyColumns,
        };
        let table = normalize(&raw_table(), &options);
        assert!(!table.has_column("Vazia"));
        assert_eq!(table.len(), 3);
    }

    #[test]
    fn drop_rows_missing_keys_policy() {
        let options = NormalizeOptions {
            date_columns: vec![],
            drop_policy: RowDropPolicy::DropRowsMissingKeys {
                key_columns: vec!["Boletim".into(), "Status_Amostra".into()],
            },
        };
        let table = normalize(&raw_table(), &options);
        assert_eq!(table.len(), 2);
        assert!(table.has_column("Vazia"));
    }

    #[test]
    fn missing_key_columns_keep_every_row() {
        let options = NormalizeOptions {
            date_columns: vec![],
            drop_policy: RowDropPolicy::DropRowsMissingKeys {
                key_columns: vec!["Ghost".into()],
            },
        };
        let table = normalize(&raw_table(), &options);
        assert_eq!(table.len(), 3);
    }

    #[test]
    fn column_emptied_by_coercion_is_kept() {
        let raw = Table::from_rows(
            vec!["Data".into(), "Qtdade".into()],
            vec![vec![CellValue::text("??"), CellValue::Number(1.0)]],
        )
        .unwrap();
        let options = NormalizeOptions {
            date_columns: vec!["Data".into()],
            drop_policy: RowDropPolicy::DropEmptyColumns,
        };
        let table = normalize(&raw, &options);
        assert_eq!(table.columns(), &["Data".to_string(), "Qtdade".to_string()]);
        assert!(table.column("Data").unwrap().all(CellValue::is_missing));
    }

    #[test]
    fn no_date_columns_is_a_no_op() {
        let raw = Table::from_rows(
            vec!["Matriz".into(), "Qtdade".into()],
            vec![
                vec![CellValue::text("Água"), CellValue::Number(3.0)],
                vec![CellValue::text("Solo"), CellValue::Number(1.0)],
            ],
        )
        .unwrap();
        for policy in [
            RowDropPolicy::DropEmptyColumns,
            RowDropPolicy::DropRowsMissingKeys {
                key_columns: vec!["Matriz".into()],
            },
        ] {
            let options = NormalizeOptions {
                date_columns: vec!["Data".into()],
                drop_policy: policy,
            };
            assert_eq!(normalize(&raw, &options), raw);
        }
    }

    #[test]
    fn with_date_columns_deduplicates() {
        let options = NormalizeOptions::default().with_date_columns(["Data", "Entrega"]);
        assert_eq!(
            options.date_columns.iter().filter(|c| *c == "Data").count(),
            1
        );
        assert!(options.date_columns.contains(&"Entrega".to_string()));
    }
}
