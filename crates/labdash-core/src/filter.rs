//! Filter engine
//!
//! AND across facets, OR within a facet. For union facets a row matches when
//! any of its member columns holds a selected value. An empty selection means
//! "select all".

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

use crate::facet::{FacetKind, FacetSpec};
use crate::{Row, Table};

/// Values chosen per facet for one derivation pass
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterSelection {
    choices: BTreeMap<String, BTreeSet<String>>,
}

impl FilterSelection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add values for a facet (builder pattern)
    pub fn select<I, S>(mut self, facet: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let entry = self.choices.entry(facet.into()).or_default();
        entry.extend(values.into_iter().map(Into::into));
        self
    }

    /// Add one value for a facet
    pub fn insert(&mut self, facet: impl Into<String>, value: impl Into<String>) {
        self.choices
            .entry(facet.into())
            .or_default()
            .insert(value.into());
    }

    /// Build from `(facet, value)` pairs
    pub fn from_pairs<I, F, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (F, V)>,
        F: Into<String>,
        V: Into<String>,
    {
        let mut selection = Self::new();
        for (facet, value) in pairs {
            selection.insert(facet, value);
        }
        selection
    }

    /// Values selected for a facet, if any
    pub fn values(&self, facet: &str) -> Option<&BTreeSet<String>> {
        self.choices.get(facet).filter(|v| !v.is_empty())
    }

    /// True when no facet restricts anything
    pub fn is_empty(&self) -> bool {
        self.choices.values().all(BTreeSet::is_empty)
    }

    /// Facet names with a non-empty selection
    pub fn facets(&self) -> impl Iterator<Item = &str> {
        self.choices
            .iter()
            .filter(|(_, v)| !v.is_empty())
            .map(|(k, _)| k.as_str())
    }
}

enum Predicate<'a> {
    Column {
        index: usize,
        values: &'a BTreeSet<String>,
    },
    Union {
        indices: Vec<usize>,
        values: BTreeSet<String>,
    },
}

impl Predicate<'_> {
    fn accepts(&self, row: &Row<'_>) -> bool {
        match self {
            Predicate::Column { index, values } => row
                .at(*index)
                .key()
                .is_some_and(|key| values.contains(&key)),
            Predicate::Union { indices, values } => indices.iter().any(|&i| {
                row.at(i)
                    .key()
                    .is_some_and(|key| values.contains(key.trim()))
            }),
        }
    }
}

/// Apply a selection to a table, keeping row order.
pub fn apply_filters(table: &Table, facets: &[FacetSpec], selection: &FilterSelection) -> Table {
    for name in selection.facets() {
        if !facets.iter().any(|f| f.name == name) {
            debug!(facet = %name, "selection for undeclared facet ignored");
        }
    }

    let predicates: Vec<Predicate<'_>> = facets
        .iter()
        .filter_map(|spec| {
            let values = selection.values(&spec.name)?;
            let indices = table.existing_indices(&spec.columns);
            if indices.is_empty() {
                debug!(facet = %spec.name, "facet columns not present, selection ignored");
                return None;
            }
            Some(match spec.kind {
                FacetKind::Column => Predicate::Column {
                    index: indices[0],
                    values,
                },
                FacetKind::Union => Predicate::Union {
                    indices,
                    values: values.iter().map(|v| v.trim().to_string()).collect(),
                },
            })
        })
        .collect();

    if predicates.is_empty() {
        return table.clone();
    }
    table.filter_rows(|row| predicates.iter().all(|p| p.accepts(row)))
}
