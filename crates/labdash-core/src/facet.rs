//! Facet declarations and option lists
//!
//! A facet is a filterable dimension backed by one column, or by several
//! columns whose values are pooled (the technician facet). Options are always
//! computed from the unfiltered table, so a selection in one facet never
//! changes the options of another.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use tracing::debug;

use crate::{CellValue, Table};

/// How a facet reads its backing columns
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FacetKind {
    /// One column, many selectable values
    Column,
    /// Several columns pooled; a match in any of them counts
    Union,
}

/// A filterable dimension declared by configuration
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FacetSpec {
    /// Facet name shown to users and used as the selection key
    pub name: String,
    pub kind: FacetKind,
    /// Backing columns (exactly one for `FacetKind::Column`)
    pub columns: Vec<String>,
}

impl FacetSpec {
    /// Single-column facet named after its column
    pub fn column(column: impl Into<String>) -> Self {
        let column = column.into();
        Self {
            name: column.clone(),
            kind: FacetKind::Column,
            columns: vec![column],
        }
    }

    /// Multi-column union facet
    pub fn union<I, S>(name: impl Into<String>, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            kind: FacetKind::Union,
            columns: columns.into_iter().map(Into::into).collect(),
        }
    }
}

/// Default facets of the sample register
pub fn default_facets() -> Vec<FacetSpec> {
    vec![
        FacetSpec::column("Status_Amostra"),
        FacetSpec::column("Matriz"),
        FacetSpec::column("Demandante"),
        FacetSpec::column("Projeto"),
        FacetSpec::column("Registrado por:"),
        FacetSpec::column("Amostra entregue por:"),
        FacetSpec::union("Técnico", ["Técnico 1", "Técnico 2", "Técnico 3"]),
    ]
}

/// Selectable options of one facet
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FacetOptions {
    pub name: String,
    pub kind: FacetKind,
    /// False when none of the backing columns exist; the facet is not offered
    pub offered: bool,
    /// Distinct values, ascending
    pub options: Vec<String>,
}

/// Option lists for every declared facet, in declaration order
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FacetIndex {
    facets: Vec<FacetOptions>,
}

impl FacetIndex {
    pub fn get(&self, name: &str) -> Option<&FacetOptions> {
        self.facets.iter().find(|f| f.name == name)
    }

    /// Options for a facet; empty for unknown or unoffered facets
    pub fn options(&self, name: &str) -> &[String] {
        self.get(name).map(|f| f.options.as_slice()).unwrap_or(&[])
    }

    /// All facets, including those not offered
    pub fn iter(&self) -> impl Iterator<Item = &FacetOptions> {
        self.facets.iter()
    }

    /// Facets that can be offered as filters
    pub fn offered(&self) -> impl Iterator<Item = &FacetOptions> {
        self.facets.iter().filter(|f| f.offered)
    }
}

/// Compute the option list of every facet from the (unfiltered) table.
pub fn build_facet_index(table: &Table, facets: &[FacetSpec]) -> FacetIndex {
    let facets = facets
        .iter()
        .map(|spec| {
            let indices = table.existing_indices(&spec.columns);
            if indices.is_empty() {
                debug!(facet = %spec.name, "facet columns not present, not offered");
                return FacetOptions {
                    name: spec.name.clone(),
                    kind: spec.kind,
                    offered: false,
                    options: Vec::new(),
                };
            }
            let options = match spec.kind {
                FacetKind::Column => column_options(table, indices[0]),
                FacetKind::Union => union_options(table, &indices),
            };
            FacetOptions {
                name: spec.name.clone(),
                kind: spec.kind,
                offered: true,
                options,
            }
        })
        .collect();
    FacetIndex { facets }
}

fn column_options(table: &Table, index: usize) -> Vec<String> {
    let mut values: Vec<&CellValue> = table
        .rows()
        .map(|row| row.at(index))
        .filter(|cell| !cell.is_missing())
        .collect();
    values.sort_by(|a, b| a.natural_cmp(b));

    let mut seen = BTreeSet::new();
    values
        .into_iter()
        .filter_map(|cell| cell.key())
        .filter(|key| seen.insert(key.clone()))
        .collect()
}

fn union_options(table: &Table, indices: &[usize]) -> Vec<String> {
    let mut values = BTreeSet::new();
    for row in table.rows() {
        for &i in indices {
            if let Some(key) = row.at(i).key() {
                let trimmed = key.trim();
                if !trimmed.is_empty() {
                    values.insert(trimmed.to_string());
                }
            }
        }
    }
    values.into_iter().collect()
}
