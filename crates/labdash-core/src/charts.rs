//! Chart breakdowns of the filtered table
//!
//! Data behind the status distribution and the volume-per-requester charts.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::Table;

/// One slice of the status distribution
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusSlice {
    pub label: String,
    pub count: usize,
}

/// Summed quantity for a group and optional series
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct VolumeBar {
    pub group: String,
    pub series: Option<String>,
    pub quantity: f64,
}

/// Count rows per raw status value, largest first.
///
/// Returns `None` if the status column is absent.
pub fn status_distribution(table: &Table, status_column: &str) -> Option<Vec<StatusSlice>> {
    let mut counts: BTreeMap<String, usize> = BTreeMap::new();
    for key in table.column(status_column)?.filter_map(|c| c.key()) {
        *counts.entry(key).or_default() += 1;
    }
    let mut slices: Vec<StatusSlice> = counts
        .into_iter()
        .map(|(label, count)| StatusSlice { label, count })
        .collect();
    slices.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.label.cmp(&b.label)));
    Some(slices)
}

/// Sum quantity per `(group, series)` pair, ordered by group then series.
///
/// Rows without a group value are skipped. Returns `None` if the group or
/// quantity column is absent; an absent series column yields `series: None`.
pub fn quantity_by(
    table: &Table,
    group_column: &str,
    series_column: Option<&str>,
    quantity_column: &str,
) -> Option<Vec<VolumeBar>> {
    let group_index = table.column_index(group_column)?;
    let quantity_index = table.column_index(quantity_column)?;
    let series_index = series_column.and_then(|c| table.column_index(c));

    let mut totals: BTreeMap<(String, Option<String>), f64> = BTreeMap::new();
    for row in table.rows() {
        let Some(group) = row.at(group_index).key() else {
            continue;
        };
        let series = series_index.and_then(|i| row.at(i).key());
        let quantity = row.at(quantity_index).as_number().unwrap_or(0.0);
        *totals.entry((group, series)).or_default() += quantity;
    }

    Some(
        totals
            .into_iter()
            .map(|((group, series), quantity)| VolumeBar {
                group,
                series,
                quantity,
            })
            .collect(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::CellValue;
    use pretty_assertions::assert_eq;

    fn table() -> Table {
        Table::from_rows(
            vec!["Status_Amostra".into(), "Demandante".into(), "Matriz".into(), "Qtdade".into()],
            vec![
                vec![CellValue::text("NA FILA"), CellValue::text("CPAO"), CellValue::text("Solo"), CellValue::Number(2.0)],
                vec![CellValue::text("PRONTAS"), CellValue::text("CPAO"), CellValue::text("Solo"), CellValue::Number(3.0)],
                vec![CellValue::text("PRONTAS"), CellValue::text("UFMS"), CellValue::Missing, CellValue::Number(1.0)],
                vec![CellValue::Missing, CellValue::Missing, CellValue::text("Água"), CellValue::Number(9.0)],
            ],
        )
        .unwrap()
    }

    #[test]
    fn distribution_sorted_by_count() {
        let slices = status_distribution(&table(), "Status_Amostra").unwrap();
        assert_eq!(
            slices,
            vec![
                StatusSlice { label: "PRONTAS".into(), count: 2 },
                StatusSlice { label: "NA FILA".into(), count: 1 },
            ]
        );
        assert!(status_distribution(&table(), "Ghost").is_none());
    }

    #[test]
    fn quantity_grouped_by_requester_and_matrix() {
        let bars = quantity_by(&table(), "Demandante", Some("Matriz"), "Qtdade").unwrap();
        assert_eq!(
            bars,
            vec![
                VolumeBar { group: "CPAO".into(), series: Some("Solo".into()), quantity: 5.0 },
                VolumeBar { group: "UFMS".into(), series: None, quantity: 1.0 },
            ]
        );
    }

    #[test]
    fn quantity_requires_group_and_quantity_columns() {
        assert!(quantity_by(&table(), "Ghost", None, "Qtdade").is_none());
        assert!(quantity_by(&table(), "Demandante", None, "Ghost").is_none());
        let bars = quantity_by(&table(), "Demandante", Some("Ghost"), "Qtdade").unwrap();
        assert!(bars.iter().all(|b| b.series.is_none()));
    }
}
