//! Dashboard configuration
//!
//! Every name the pipeline looks for (columns, status labels, markers) is
//! configuration. Defaults describe the laboratory's sample register; other
//! sheet revisions are expressed as a different TOML file, not a code change.

use serde::{Deserialize, Serialize};

use crate::facet::{default_facets, FacetKind, FacetSpec};
use crate::metrics::MetricsConfig;
use crate::normalize::{NormalizeOptions, RowDropPolicy};
use crate::timeline::TimelineConfig;
use crate::ConfigError;

/// Complete dashboard configuration
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DashboardConfig {
    /// Dashboard title
    pub title: String,
    pub source: SourceConfig,
    pub normalize: NormalizeOptions,
    pub metrics: MetricsConfig,
    pub timeline: TimelineConfig,
    pub charts: ChartsConfig,
    pub columns: ColumnsConfig,
    pub access: AccessConfig,
    pub facets: Vec<FacetSpec>,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            title: "Laboratório de Análises Físico-Químicas".into(),
            source: SourceConfig::default(),
            normalize: NormalizeOptions::default(),
            metrics: MetricsConfig::default(),
            timeline: TimelineConfig::default(),
            charts: ChartsConfig::default(),
            columns: ColumnsConfig::default(),
            access: AccessConfig::default(),
            facets: default_facets(),
        }
    }
}

/// Where the sample register comes from
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    /// Spreadsheet id of the published sheet
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sheet_id: Option<String>,
    /// Sheet (tab) name
    pub sheet_name: String,
    /// Explicit CSV URL or file path; takes precedence over `sheet_id`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    /// Seconds a fetched table is reused
    pub cache_ttl_secs: u64,
    /// HTTP timeout in seconds
    pub timeout_secs: u64,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            sheet_id: None,
            sheet_name: "REGISTRO".into(),
            location: None,
            cache_ttl_secs: 30,
            timeout_secs: 20,
        }
    }
}

/// Columns used by the chart breakdowns
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChartsConfig {
    /// Bar chart x axis
    pub group_column: String,
    /// Bar chart color split
    #[serde(skip_serializing_if = "Option::is_none")]
    pub series_column: Option<String>,
}

impl Default for ChartsConfig {
    fn default() -> Self {
        Self {
            group_column: "Demandante".into(),
            series_column: Some("Matriz".into()),
        }
    }
}

/// Detail table column defaults
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColumnsConfig {
    pub default_visible: Vec<String>,
}

impl Default for ColumnsConfig {
    fn default() -> Self {
        Self {
            default_visible: [
                "Boletim",
                "Data",
                "Status_Amostra",
                "Matriz",
                "Demandante",
                "Projeto",
                "Qtdade",
                "Técnico 1",
                "Técnico 2",
                "Técnico 3",
            ]
            .into_iter()
            .map(String::from)
            .collect(),
        }
    }
}

/// Editor access
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AccessConfig {
    /// Shared secret unlocking the editor role; unset means nobody is editor
    #[serde(skip_serializing_if = "Option::is_none")]
    pub editor_secret: Option<String>,
}

impl DashboardConfig {
    /// Check values that would make a derivation pass meaningless
    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |field: String, reason: &str| ConfigError::InvalidValue {
            field,
            reason: reason.to_string(),
        };

        for (i, facet) in self.facets.iter().enumerate() {
            if facet.name.trim().is_empty() {
                return Err(invalid(format!("facets[{i}].name"), "must not be empty"));
            }
            match facet.kind {
                FacetKind::Column if facet.columns.len() != 1 => {
                    return Err(invalid(
                        format!("facets[{i}].columns"),
                        "a column facet needs exactly one column",
                    ));
                }
                FacetKind::Union if facet.columns.is_empty() => {
                    return Err(invalid(
                        format!("facets[{i}].columns"),
                        "a union facet needs at least one column",
                    ));
                }
                _ => {}
            }
            if self.facets[..i].iter().any(|f| f.name == facet.name) {
                return Err(invalid(format!("facets[{i}].name"), "duplicate facet name"));
            }
        }

        if let RowDropPolicy::DropRowsMissingKeys { key_columns } = &self.normalize.drop_policy {
            if key_columns.is_empty() {
                return Err(invalid(
                    "normalize.drop_policy.key_columns".into(),
                    "must list at least one column",
                ));
            }
        }

        if self.source.cache_ttl_secs == 0 {
            return Err(invalid("source.cache_ttl_secs".into(), "must be > 0"));
        }
        if self.source.timeout_secs == 0 {
            return Err(invalid("source.timeout_secs".into(), "must be > 0"));
        }
        if self.timeline.start_column.trim().is_empty() {
            return Err(invalid("timeline.start_column".into(), "must not be empty"));
        }
        Ok(())
    }

    /// Normalization options extended with the timeline's date columns
    pub fn effective_normalize(&self) -> NormalizeOptions {
        self.normalize.clone().with_date_columns(
            std::iter::once(self.timeline.start_column.clone())
                .chain(self.timeline.deadline_columns.iter().cloned()),
        )
    }
}
