//! Plain text dashboard for console output

use labdash_core::metrics::{Measure, StatusBucket};
use labdash_core::{format_number, DashboardView, RenderError, Renderer, Table};

/// Shown instead of metrics and detail when the filters match nothing
pub const NO_MATCH_MESSAGE: &str = "No rows match the selected filters.";

/// Console renderer: header, metrics, chart breakdowns and detail table
#[derive(Clone, Debug)]
pub struct TextRenderer {
    /// Include the detail table
    pub show_detail: bool,
    /// Cap on detail rows printed; `None` prints all
    pub max_rows: Option<usize>,
    /// Cap on the width of a detail column, in characters
    pub max_cell_width: usize,
}

impl Default for TextRenderer {
    fn default() -> Self {
        Self {
            show_detail: true,
            max_rows: None,
            max_cell_width: 24,
        }
    }
}

impl TextRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Only the summary, without the detail table
    pub fn summary_only(mut self) -> Self {
        self.show_detail = false;
        self
    }

    pub fn max_rows(mut self, rows: usize) -> Self {
        self.max_rows = Some(rows);
        self
    }

    fn render_metrics(&self, out: &mut String, view: &DashboardView) {
        let metrics = &view.metrics;
        out.push_str(&format!("Samples shown: {} of {}\n", metrics.displayed_row_count, view.total_rows));
        out.push_str(&format!("Total quantity: {}\n", measure(&metrics.total_quantity, |q| format_number(*q))));

        match &metrics.status_counts {
            Measure::Value(_) => {
                for bucket in StatusBucket::ALL {
                    let count = metrics.status_count(bucket).unwrap_or(0);
                    out.push_str(&format!("  {:<22} {}\n", bucket.as_str(), count));
                }
            }
            Measure::NotApplicable => {
                out.push_str("Status counts: n/a\n");
            }
        }

        for filled in &metrics.filled_counts {
            out.push_str(&format!("{}: {}\n", filled.label, measure(&filled.count, ToString::to_string)));
        }
    }

    fn render_charts(&self, out: &mut String, view: &DashboardView) {
        if let Some(slices) = &view.status_distribution {
            out.push_str("\nStatus distribution\n");
            for slice in slices {
                out.push_str(&format!("  {:<22} {}\n", slice.label, slice.count));
            }
        }
        if let Some(bars) = &view.volume {
            out.push_str("\nQuantity by group\n");
            for bar in bars {
                let label = match &bar.series {
                    Some(series) => format!("{} / {}", bar.group, series),
                    None => bar.group.clone(),
                };
                out.push_str(&format!("  {:<30} {}\n", label, format_number(bar.quantity)));
            }
        }
    }

    fn render_detail(&self, out: &mut String, detail: &Table) {
        if detail.columns().is_empty() {
            out.push_str("\n(no columns selected)\n");
            return;
        }

        let shown = self.max_rows.unwrap_or(usize::MAX).min(detail.len());
        let cells: Vec<Vec<String>> = detail
            .rows()
            .take(shown)
            .map(|row| {
                row.cells()
                    .iter()
                    .map(|c| clip(&c.to_string(), self.max_cell_width))
                    .collect()
            })
            .collect();
        let headers: Vec<String> = detail.columns().iter().map(|c| clip(c, self.max_cell_width)).collect();

        let widths: Vec<usize> = headers
            .iter()
            .enumerate()
            .map(|(i, h)| {
                cells
                    .iter()
                    .map(|r| r[i].chars().count())
                    .chain(std::iter::once(h.chars().count()))
                    .max()
                    .unwrap_or(0)
            })
            .collect();

        out.push('\n');
        out.push_str(&format!("{}\n", join_padded(&headers, &widths)));
        let rule: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
        out.push_str(&format!("{}\n", rule.join("  ")));
        for row in &cells {
            out.push_str(&format!("{}\n", join_padded(row, &widths)));
        }
        if shown < detail.len() {
            out.push_str(&format!("... {} more rows\n", detail.len() - shown));
        }
    }
}

impl Renderer for TextRenderer {
    type Output = String;

    fn render(&self, view: &DashboardView) -> Result<String, RenderError> {
        let mut out = String::new();
        out.push_str(&format!("{}\n", view.title));
        out.push_str(&format!("{}\n", "=".repeat(view.title.chars().count())));
        out.push_str(&format!("Reference date: {}\n", view.reference_now.format("%d/%m/%Y")));
        if !view.selection.is_empty() {
            let filters: Vec<String> = view
                .selection
                .facets()
                .filter_map(|facet| {
                    let values = view.selection.values(facet)?;
                    Some(format!("{facet} = {}", values.iter().cloned().collect::<Vec<_>>().join(" | ")))
                })
                .collect();
            out.push_str(&format!("Filters: {}\n", filters.join("; ")));
        }
        out.push('\n');

        if view.is_empty() {
            out.push_str(NO_MATCH_MESSAGE);
            out.push('\n');
            out.push_str(&format!("{} rows in the register.\n", view.total_rows));
            return Ok(out);
        }

        self.render_metrics(&mut out, view);
        self.render_charts(&mut out, view);
        if self.show_detail {
            self.render_detail(&mut out, &view.detail_table());
        }
        Ok(out)
    }
}

fn measure<T>(value: &Measure<T>, fmt: impl Fn(&T) -> String) -> String {
    value.value().map_or_else(|| "n/a".to_string(), fmt)
}

fn clip(s: &str, max: usize) -> String {
    let s = s.replace(['\n', '\r'], " ");
    if s.chars().count() <= max {
        s
    } else {
        let kept: String = s.chars().take(max.saturating_sub(1)).collect();
        format!("{kept}…")
    }
}

fn join_padded(cells: &[String], widths: &[usize]) -> String {
    cells
        .iter()
        .zip(widths)
        .map(|(cell, width)| format!("{cell:<width$}"))
        .collect::<Vec<_>>()
        .join("  ")
        .trim_end()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures;
    use pretty_assertions::assert_eq;

    #[test]
    fn renders_metrics_and_detail() {
        let out = TextRenderer::new().render(&fixtures::view()).unwrap();
        assert!(out.starts_with("Laboratório"));
        assert!(out.contains("Samples shown: 4 of 4"));
        assert!(out.contains("Total quantity: 10"));
        assert!(out.contains("Ensaios Química: 2"));
        // Física column absent from the register
        assert!(out.contains("Ensaios Física: n/a"));
        assert!(out.contains("CPAO / Solo"));
        assert!(out.contains("B-04"));
    }

    #[test]
    fn header_and_sections_are_line_separated() {
        let out = TextRenderer::new().render(&fixtures::view()).unwrap();
        let lines: Vec<&str> = out.lines().collect();
        assert!(lines[1].chars().all(|c| c == '='));
        assert!(lines[2].starts_with("Reference date: "));
        assert_eq!(lines[3], "");
        assert_eq!(lines[4], "Samples shown: 4 of 4");
        assert!(lines.contains(&"Status distribution"));
        assert!(out.ends_with('\n'));
    }

    #[test]
    fn empty_result_has_distinct_message() {
        let out = TextRenderer::new().render(&fixtures::empty_view()).unwrap();
        assert!(out.contains(NO_MATCH_MESSAGE));
        assert!(out.contains("Filters: Matriz = Ar"));
        assert!(!out.contains("Samples shown"));
    }

    #[test]
    fn summary_only_skips_detail() {
        let out = TextRenderer::new().summary_only().render(&fixtures::view()).unwrap();
        assert!(!out.contains("B-04"));
    }

    #[test]
    fn max_rows_truncates_detail() {
        let out = TextRenderer::new().max_rows(1).render(&fixtures::view()).unwrap();
        assert!(out.contains("... 3 more rows"));
    }

    #[test]
    fn clip_and_pad() {
        assert_eq!(clip("Água bruta", 5), "Água…");
        assert_eq!(clip("a\nb", 5), "a b");
        assert_eq!(
            join_padded(&["ab".into(), "c".into()], &[4, 3]),
            "ab    c"
        );
    }
}
