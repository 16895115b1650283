//! One derivation pass from a raw table to a renderable view

use chrono::NaiveDate;
use serde::{Deserialize, Serialize, Serializer};
use tracing::{debug, info};

use crate::charts::{quantity_by, status_distribution, StatusSlice, VolumeBar};
use crate::config::DashboardConfig;
use crate::facet::{build_facet_index, FacetIndex};
use crate::filter::{apply_filters, FilterSelection};
use crate::metrics::{compute_metrics, DashboardMetrics};
use crate::normalize::normalize;
use crate::timeline::{classify, TimelineRow};
use crate::visibility::{resolve_visible_columns, ColumnVisibilityPolicy, Role};
use crate::Table;

/// Per-request user input
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DashboardRequest {
    pub selection: FilterSelection,
    pub role: Role,
    /// Editor's column choice; ignored for viewers
    pub column_override: Option<Vec<String>>,
}

/// Everything a renderer needs, derived fresh for each request.
///
/// Serialized views carry the detail table under `detail` instead of the
/// filtered table, so columns hidden from the role never leave the view.
#[derive(Clone, Debug, PartialEq)]
pub struct DashboardView {
    pub title: String,
    pub reference_now: NaiveDate,
    pub role: Role,
    /// Rows after normalization, before filtering
    pub total_rows: usize,
    pub facets: FacetIndex,
    pub selection: FilterSelection,
    pub filtered: Table,
    pub metrics: DashboardMetrics,
    pub timeline: Vec<TimelineRow>,
    pub status_distribution: Option<Vec<StatusSlice>>,
    pub volume: Option<Vec<VolumeBar>>,
    pub visible_columns: Vec<String>,
}

impl DashboardView {
    /// No row matches the current filters
    pub fn is_empty(&self) -> bool {
        self.filtered.is_empty()
    }

    /// The filtered table restricted to the visible columns
    pub fn detail_table(&self) -> Table {
        self.filtered.project(&self.visible_columns)
    }
}

#[derive(Serialize)]
struct SerializedView<'a> {
    title: &'a str,
    reference_now: NaiveDate,
    role: Role,
    total_rows: usize,
    facets: &'a FacetIndex,
    selection: &'a FilterSelection,
    detail: Table,
    metrics: &'a DashboardMetrics,
    timeline: &'a [TimelineRow],
    status_distribution: Option<&'a [StatusSlice]>,
    volume: Option<&'a [VolumeBar]>,
    visible_columns: &'a [String],
}

impl Serialize for DashboardView {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        SerializedView {
            title: &self.title,
            reference_now: self.reference_now,
            role: self.role,
            total_rows: self.total_rows,
            facets: &self.facets,
            selection: &self.selection,
            detail: self.detail_table(),
            metrics: &self.metrics,
            timeline: &self.timeline,
            status_distribution: self.status_distribution.as_deref(),
            volume: self.volume.as_deref(),
            visible_columns: &self.visible_columns,
        }
        .serialize(serializer)
    }
}

/// Derivation pipeline bound to a configuration
#[derive(Clone, Debug)]
pub struct Dashboard<'a> {
    config: &'a DashboardConfig,
}

impl<'a> Dashboard<'a> {
    pub fn new(config: &'a DashboardConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &DashboardConfig {
        self.config
    }

    /// Normalize, index facets, filter, then derive metrics, timeline,
    /// chart data and visible columns.
    pub fn derive(&self, raw: &Table, request: &DashboardRequest, reference_now: NaiveDate) -> DashboardView {
        let config = self.config;
        let table = normalize(raw, &config.effective_normalize());
        debug!(
            raw_rows = raw.len(),
            rows = table.len(),
            columns = table.columns().len(),
            "table normalized"
        );

        let facets = build_facet_index(&table, &config.facets);
        let filtered = apply_filters(&table, &config.facets, &request.selection);
        info!(total = table.len(), shown = filtered.len(), "filters applied");

        let metrics = compute_metrics(&filtered, &config.metrics);
        let timeline = classify(&filtered, &config.timeline, reference_now);
        let status_distribution = status_distribution(&filtered, &config.metrics.status_column);
        let volume = quantity_by(
            &filtered,
            &config.charts.group_column,
            config.charts.series_column.as_deref(),
            &config.metrics.quantity_column,
        );

        let mut policy = ColumnVisibilityPolicy::new(request.role, config.columns.default_visible.clone());
        policy.user_override = request.column_override.clone();
        let visible_columns = resolve_visible_columns(&policy, table.columns());

        DashboardView {
            title: config.title.clone(),
            reference_now,
            role: request.role,
            total_rows: table.len(),
            facets,
            selection: request.selection.clone(),
            filtered,
            metrics,
            timeline,
            status_distribution,
            volume,
            visible_columns,
        }
    }
}
