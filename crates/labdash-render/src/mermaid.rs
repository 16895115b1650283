//! MermaidJS timeline renderer
//!
//! Emits the sample timeline as a Mermaid Gantt chart, for pasting into
//! Markdown reports and wikis.
//!
//! ## Example Output
//!
//! ```text
//! gantt
//!     title Laboratório de Análises Físico-Químicas
//!     dateFormat YYYY-MM-DD
//!
//!     section Completed
//!     B-01 :done, r0, 2024-01-02, 2024-01-05
//!
//!     section Overdue
//!     B-03 :crit, r2, 2024-01-04, 2024-01-08
//! ```

use labdash_core::timeline::{sort_for_display, TimelineRow, TimelineStatus};
use labdash_core::{DashboardView, RenderError, Renderer};

/// MermaidJS Gantt renderer for the sample timeline
#[derive(Clone, Debug)]
pub struct MermaidRenderer {
    /// Group rows into one section per classification
    pub show_sections: bool,
    /// Tag rows with done/crit/active
    pub show_status_tags: bool,
}

impl Default for MermaidRenderer {
    fn default() -> Self {
        Self {
            show_sections: true,
            show_status_tags: true,
        }
    }
}

impl MermaidRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Disable section grouping
    pub fn no_sections(mut self) -> Self {
        self.show_sections = false;
        self
    }

    /// Disable done/crit/active tags
    pub fn no_status_tags(mut self) -> Self {
        self.show_status_tags = false;
        self
    }

    /// Mermaid is sensitive to colons and a few other characters in names
    fn sanitize_name(name: &str) -> String {
        name.replace([':', ';'], "-")
            .replace('#', "")
            .replace('\n', " ")
            .replace('\r', "")
    }

    fn tag(status: TimelineStatus) -> Option<&'static str> {
        match status {
            TimelineStatus::Completed => Some("done"),
            TimelineStatus::Overdue => Some("crit"),
            TimelineStatus::InAnalysis => Some("active"),
            TimelineStatus::Queued => None,
        }
    }

    fn format_row(&self, row: &TimelineRow, id: usize) -> String {
        let mut modifiers = String::new();
        if self.show_status_tags {
            if let Some(tag) = Self::tag(row.classification) {
                modifiers.push_str(tag);
                modifiers.push_str(", ");
            }
        }
        format!(
            "{} :{}r{}, {}, {}",
            Self::sanitize_name(&row.row_key),
            modifiers,
            id,
            row.start.min(row.end).format("%Y-%m-%d"),
            row.end.max(row.start).format("%Y-%m-%d"),
        )
    }
}

impl Renderer for MermaidRenderer {
    type Output = String;

    fn render(&self, view: &DashboardView) -> Result<String, RenderError> {
        if view.timeline.is_empty() {
            return Err(RenderError::InvalidData("No timeline rows to render".into()));
        }

        let mut rows = view.timeline.clone();
        sort_for_display(&mut rows);

        let mut output = String::from("gantt\n");
        output.push_str(&format!("    title {}\n", Self::sanitize_name(&view.title)));
        output.push_str("    dateFormat YYYY-MM-DD\n\n");

        if self.show_sections {
            for status in TimelineStatus::ALL {
                let section: Vec<(usize, &TimelineRow)> = rows
                    .iter()
                    .enumerate()
                    .filter(|(_, r)| r.classification == status)
                    .collect();
                if section.is_empty() {
                    continue;
                }
                output.push_str(&format!("    section {}\n", status.as_str()));
                for (id, row) in section {
                    output.push_str(&format!("    {}\n", self.format_row(row, id)));
                }
                output.push('\n');
            }
        } else {
            for (id, row) in rows.iter().enumerate() {
                output.push_str(&format!("    {}\n", self.format_row(row, id)));
            }
        }

        Ok(output)
    }
}
