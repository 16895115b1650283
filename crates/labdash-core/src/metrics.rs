//! Metrics aggregation over the filtered table
//!
//! Metrics whose source column is absent are reported as
//! `Measure::NotApplicable` rather than zero.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use tracing::debug;

use crate::Table;

// ============================================================================
// Status vocabulary
// ============================================================================

/// Semantic status buckets of a sample
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusBucket {
    Ready,
    InAnalysis,
    Queued,
    VirtuallyRegistered,
}

impl StatusBucket {
    pub const ALL: [StatusBucket; 4] = [
        StatusBucket::Ready,
        StatusBucket::InAnalysis,
        StatusBucket::Queued,
        StatusBucket::VirtuallyRegistered,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            StatusBucket::Ready => "Ready",
            StatusBucket::InAnalysis => "In analysis",
            StatusBucket::Queued => "Queued",
            StatusBucket::VirtuallyRegistered => "Virtually registered",
        }
    }
}

impl fmt::Display for StatusBucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Status labels per bucket, as written in the sheet.
///
/// Labels are matched against the upper-cased, trimmed status cell. Different
/// revisions of the sheet spell the same bucket differently, so each bucket
/// accepts several labels.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StatusVocabulary {
    pub ready: Vec<String>,
    pub in_analysis: Vec<String>,
    pub queued: Vec<String>,
    pub virtually_registered: Vec<String>,
}

impl Default for StatusVocabulary {
    fn default() -> Self {
        Self {
            ready: vec!["PRONTAS".into(), "BOLETIM PRONTO".into()],
            in_analysis: vec!["EM ANÁLISE".into(), "EM ANALISE".into()],
            queued: vec!["NA FILA".into(), "AGUARDANDO ANÁLISE".into()],
            virtually_registered: vec!["REGISTRADA VIRTUALMENTE".into()],
        }
    }
}

impl StatusVocabulary {
    pub fn labels(&self, bucket: StatusBucket) -> &[String] {
        match bucket {
            StatusBucket::Ready => &self.ready,
            StatusBucket::InAnalysis => &self.in_analysis,
            StatusBucket::Queued => &self.queued,
            StatusBucket::VirtuallyRegistered => &self.virtually_registered,
        }
    }

    /// First bucket whose label equals the normalized status
    pub fn bucket_for(&self, status: &str) -> Option<StatusBucket> {
        let status = status.trim().to_uppercase();
        if status.is_empty() {
            return None;
        }
        StatusBucket::ALL.into_iter().find(|&bucket| {
            self.labels(bucket)
                .iter()
                .any(|label| label.trim().to_uppercase() == status)
        })
    }
}

// ============================================================================
// Metric values
// ============================================================================

/// A metric value, or a marker that its source column is absent
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Measure<T> {
    Value(T),
    NotApplicable,
}

impl<T> Measure<T> {
    pub fn value(&self) -> Option<&T> {
        match self {
            Measure::Value(v) => Some(v),
            Measure::NotApplicable => None,
        }
    }

    pub fn is_applicable(&self) -> bool {
        matches!(self, Measure::Value(_))
    }
}

/// Count of non-missing cells in a column, shown under a label
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilledCountSpec {
    pub label: String,
    pub column: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FilledCount {
    pub label: String,
    pub column: String,
    pub count: Measure<usize>,
}

/// Metrics settings
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    pub quantity_column: String,
    pub status_column: String,
    pub vocabulary: StatusVocabulary,
    pub filled_counts: Vec<FilledCountSpec>,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            quantity_column: "Qtdade".into(),
            status_column: "Status_Amostra".into(),
            vocabulary: StatusVocabulary::default(),
            filled_counts: vec![
                FilledCountSpec {
                    label: "Ensaios Química".into(),
                    column: "Química".into(),
                },
                FilledCountSpec {
                    label: "Ensaios Física".into(),
                    column: "Física".into(),
                },
            ],
        }
    }
}

/// Summary metrics of the filtered table
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DashboardMetrics {
    pub displayed_row_count: usize,
    pub total_quantity: Measure<f64>,
    pub status_counts: Measure<BTreeMap<StatusBucket, usize>>,
    pub filled_counts: Vec<FilledCount>,
}

impl DashboardMetrics {
    /// Rows counted in any status bucket
    pub fn counted_statuses(&self) -> usize {
        self.status_counts
            .value()
            .map(|counts| counts.values().sum())
            .unwrap_or(0)
    }

    pub fn status_count(&self, bucket: StatusBucket) -> Option<usize> {
        self.status_counts
            .value()
            .map(|counts| counts.get(&bucket).copied().unwrap_or(0))
    }
}

/// Compute the fixed metric set over a filtered table.
pub fn compute_metrics(table: &Table, config: &MetricsConfig) -> DashboardMetrics {
    let total_quantity: Measure<f64> = match table.column(&config.quantity_column) {
        Some(cells) => Measure::Value(cells.filter_map(|c| c.as_number()).sum()),
        None => {
            debug!(column = %config.quantity_column, "quantity column absent");
            Measure::NotApplicable
        }
    };

    let status_counts = match table.column(&config.status_column) {
        Some(cells) => {
            let mut counts: BTreeMap<StatusBucket, usize> =
                StatusBucket::ALL.into_iter().map(|b| (b, 0)).collect();
            for key in cells.filter_map(|c| c.key()) {
                if let Some(bucket) = config.vocabulary.bucket_for(&key) {
                    *counts.entry(bucket).or_default() += 1;
                }
            }
            Measure::Value(counts)
        }
        None => {
            debug!(column = %config.status_column, "status column absent");
            Measure::NotApplicable
        }
    };

    let filled_counts = config
        .filled_counts
        .iter()
        .map(|spec| FilledCount {
            label: spec.label.clone(),
            column: spec.column.clone(),
            count: match table.column(&spec.column) {
                Some(cells) => Measure::Value(cells.filter(|c| !c.is_missing()).count()),
                None => Measure::NotApplicable,
            },
        })
        .collect();

    DashboardMetrics {
        displayed_row_count: table.len(),
        total_quantity,
        status_counts,
        filled_counts,
    }
}
