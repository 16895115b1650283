//! Timeline classification
//!
//! Each sample with a start date and at least one deadline becomes a
//! `TimelineRow` spanning start to the latest deadline. Classification is
//! evaluated in a fixed order, first match wins:
//!
//! 1. status contains a completed marker → `Completed`
//! 2. end date before the reference date → `Overdue`
//! 3. status contains an in-analysis marker → `InAnalysis`
//! 4. otherwise → `Queued`
//!
//! A completed sample is never overdue, even with a past end date.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;

use crate::{Row, Table};

/// Derived status of a sample on the timeline
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum TimelineStatus {
    Completed,
    Overdue,
    InAnalysis,
    Queued,
}

impl TimelineStatus {
    pub const ALL: [TimelineStatus; 4] = [
        TimelineStatus::Completed,
        TimelineStatus::Overdue,
        TimelineStatus::InAnalysis,
        TimelineStatus::Queued,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TimelineStatus::Completed => "Completed",
            TimelineStatus::Overdue => "Overdue",
            TimelineStatus::InAnalysis => "In analysis",
            TimelineStatus::Queued => "Queued",
        }
    }
}

impl fmt::Display for TimelineStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One sample on the Gantt-style timeline
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimelineRow {
    /// Record identifier, or the 1-based row position when it is missing
    pub row_key: String,
    pub start: NaiveDate,
    /// Latest deadline across the deadline columns
    pub end: NaiveDate,
    pub classification: TimelineStatus,
}

impl TimelineRow {
    /// Calendar days from start to end (negative when the data is inverted)
    pub fn span_days(&self) -> i64 {
        (self.end - self.start).num_days()
    }
}

/// Substrings that identify completed, queued and in-analysis statuses.
///
/// Queued markers are checked before in-analysis ones, since a waiting
/// label such as "AGUARDANDO ANÁLISE" also contains the in-analysis marker.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimelineMarkers {
    pub completed: Vec<String>,
    pub queued: Vec<String>,
    pub in_analysis: Vec<String>,
}

impl Default for TimelineMarkers {
    fn default() -> Self {
        Self {
            completed: vec!["PRONT".into(), "READY".into()],
            queued: vec!["AGUARDANDO".into(), "NA FILA".into(), "QUEUED".into()],
            in_analysis: vec!["ANÁLISE".into(), "ANALISE".into(), "IN ANALYSIS".into()],
        }
    }
}

impl TimelineMarkers {
    fn matches(markers: &[String], status: &str) -> bool {
        markers
            .iter()
            .map(|m| m.trim().to_uppercase())
            .any(|m| !m.is_empty() && status.contains(&m))
    }
}

/// Timeline settings
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimelineConfig {
    pub start_column: String,
    pub status_column: String,
    /// Column holding the record identifier
    pub key_column: String,
    /// Per-technician due dates; the row's end is their maximum
    pub deadline_columns: Vec<String>,
    pub markers: TimelineMarkers,
}

impl Default for TimelineConfig {
    fn default() -> Self {
        Self {
            start_column: "Data".into(),
            status_column: "Status_Amostra".into(),
            key_column: "Boletim".into(),
            deadline_columns: vec![
                "Prazo Técnico 1".into(),
                "Prazo Técnico 2".into(),
                "Prazo Técnico 3".into(),
            ],
            markers: TimelineMarkers::default(),
        }
    }
}

/// Classify every eligible row of the filtered table.
///
/// Rows without a start date or without any deadline date are left out. The
/// output follows table order; use [`sort_for_display`] for rendering.
pub fn classify(table: &Table, config: &TimelineConfig, reference_now: NaiveDate) -> Vec<TimelineRow> {
    let Some(start_index) = table.column_index(&config.start_column) else {
        debug!(column = %config.start_column, "start column absent, timeline empty");
        return Vec::new();
    };
    let deadlines = table.existing_indices(&config.deadline_columns);
    if deadlines.is_empty() {
        debug!(columns = ?config.deadline_columns, "no deadline column present, timeline empty");
        return Vec::new();
    }
    let status_index = table.column_index(&config.status_column);
    let key_index = table.column_index(&config.key_column);

    table
        .rows()
        .filter_map(|row| {
            let start = row.at(start_index).as_date()?;
            let end = deadlines.iter().filter_map(|&i| row.at(i).as_date()).max()?;
            let status = status_index
                .and_then(|i| row.at(i).key())
                .map(|s| s.to_uppercase())
                .unwrap_or_default();
            Some(TimelineRow {
                row_key: row_key(&row, key_index),
                start,
                end,
                classification: classify_one(&status, end, &config.markers, reference_now),
            })
        })
        .collect()
}

fn row_key(row: &Row<'_>, key_index: Option<usize>) -> String {
    key_index
        .and_then(|i| row.at(i).key())
        .map(|k| k.trim().to_string())
        .filter(|k| !k.is_empty())
        .unwrap_or_else(|| (row.index() + 1).to_string())
}

fn classify_one(
    status: &str,
    end: NaiveDate,
    markers: &TimelineMarkers,
    reference_now: NaiveDate,
) -> TimelineStatus {
    if TimelineMarkers::matches(&markers.completed, status) {
        TimelineStatus::Completed
    } else if end < reference_now {
        TimelineStatus::Overdue
    } else if TimelineMarkers::matches(&markers.queued, status) {
        TimelineStatus::Queued
    } else if TimelineMarkers::matches(&markers.in_analysis, status) {
        TimelineStatus::InAnalysis
    } else {
        TimelineStatus::Queued
    }
}

/// Sort rows by start date ascending (stable, so ties keep table order)
pub fn sort_for_display(rows: &mut [TimelineRow]) {
    rows.sort_by_key(|r| r.start);
}

/// Earliest start and latest end across rows
pub fn date_range(rows: &[TimelineRow]) -> Option<(NaiveDate, NaiveDate)> {
    let start = rows.iter().map(|r| r.start.min(r.end)).min()?;
    let end = rows.iter().map(|r| r.end.max(r.start)).max()?;
    Some((start, end))
}
