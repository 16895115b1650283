//! # labdash-render
//!
//! Rendering backends for derived dashboard views.
//!
//! This crate provides:
//! - Plain text dashboard for the console
//! - SVG timeline (Gantt-style) rendering
//! - MermaidJS timeline rendering (for Markdown/docs)
//! - Excel export of the detail table and summary
//!
//! ## Example
//!
//! ```rust,ignore
//! use labdash_core::{Dashboard, DashboardConfig, DashboardRequest, Renderer};
//! use labdash_render::{ExcelRenderer, MermaidRenderer, SvgRenderer, TextRenderer};
//!
//! let view = Dashboard::new(&config).derive(&table, &DashboardRequest::default(), today);
//!
//! println!("{}", TextRenderer::new().render(&view)?);
//! let svg = SvgRenderer::default().render(&view)?;
//! let mermaid = MermaidRenderer::new().render(&view)?;
//! std::fs::write("amostras.xlsx", ExcelRenderer::new().render(&view)?)?;
//! ```

pub mod excel;
pub mod mermaid;
pub mod text;

pub use excel::ExcelRenderer;
pub use mermaid::MermaidRenderer;
pub use text::TextRenderer;

use chrono::NaiveDate;
use svg::node::element::{Group, Line, Rectangle, Text};
use svg::Document;

use labdash_core::timeline::{date_range, sort_for_display, TimelineRow, TimelineStatus};
use labdash_core::{DashboardView, RenderError, Renderer};

/// SVG timeline renderer configuration
#[derive(Clone, Debug)]
pub struct SvgRenderer {
    /// Width of the chart area (excluding labels) in pixels
    pub chart_width: u32,
    /// Height per sample row in pixels
    pub row_height: u32,
    /// Width of the label column in pixels
    pub label_width: u32,
    /// Header height in pixels
    pub header_height: u32,
    /// Padding around the chart
    pub padding: u32,
    pub completed_color: String,
    pub overdue_color: String,
    pub in_analysis_color: String,
    pub queued_color: String,
    /// Color of the reference-date marker
    pub today_color: String,
    pub background_color: String,
    pub grid_color: String,
    pub text_color: String,
    pub font_family: String,
    /// Font size in pixels
    pub font_size: u32,
}

impl Default for SvgRenderer {
    fn default() -> Self {
        Self {
            chart_width: 800,
            row_height: 24,
            label_width: 140,
            header_height: 50,
            padding: 20,
            completed_color: "#27ae60".into(),
            overdue_color: "#e74c3c".into(),
            in_analysis_color: "#f39c12".into(),
            queued_color: "#3498db".into(),
            today_color: "#8e44ad".into(),
            background_color: "#ffffff".into(),
            grid_color: "#ecf0f1".into(),
            text_color: "#2c3e50".into(),
            font_family: "system-ui, -apple-system, sans-serif".into(),
            font_size: 12,
        }
    }
}

impl SvgRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Configure chart width
    pub fn chart_width(mut self, width: u32) -> Self {
        self.chart_width = width;
        self
    }

    /// Configure row height
    pub fn row_height(mut self, height: u32) -> Self {
        self.row_height = height;
        self
    }

    pub fn color_for(&self, status: TimelineStatus) -> &str {
        match status {
            TimelineStatus::Completed => &self.completed_color,
            TimelineStatus::Overdue => &self.overdue_color,
            TimelineStatus::InAnalysis => &self.in_analysis_color,
            TimelineStatus::Queued => &self.queued_color,
        }
    }

    fn total_width(&self) -> u32 {
        self.padding * 2 + self.label_width + self.chart_width
    }

    fn total_height(&self, row_count: usize) -> u32 {
        self.padding * 2 + self.header_height + (row_count as u32 * self.row_height)
    }

    fn pixels_per_day(&self, start: NaiveDate, end: NaiveDate) -> f64 {
        let days = (end - start).num_days().max(1) as f64;
        self.chart_width as f64 / days
    }

    fn date_to_x(&self, date: NaiveDate, range_start: NaiveDate, px_per_day: f64) -> f64 {
        let days = (date - range_start).num_days() as f64;
        self.padding as f64 + self.label_width as f64 + (days * px_per_day)
    }

    /// Date labels along the top
    fn render_header(&self, range_start: NaiveDate, range_end: NaiveDate, px_per_day: f64) -> Group {
        let mut group = Group::new().set("class", "header");

        let header_bg = Rectangle::new()
            .set("x", self.padding)
            .set("y", self.padding)
            .set("width", self.label_width + self.chart_width)
            .set("height", self.header_height)
            .set("fill", "#f8f9fa");
        group = group.add(header_bg);

        let total_days = (range_end - range_start).num_days();
        let interval_days = if total_days <= 14 {
            1
        } else if total_days <= 60 {
            7
        } else if total_days <= 180 {
            14
        } else {
            30
        };

        let mut current = range_start;
        while current <= range_end {
            let x = self.date_to_x(current, range_start, px_per_day);

            let tick = Line::new()
                .set("x1", x)
                .set("y1", self.padding + self.header_height - 10)
                .set("x2", x)
                .set("y2", self.padding + self.header_height)
                .set("stroke", self.text_color.as_str())
                .set("stroke-width", 1);
            group = group.add(tick);

            let label = if interval_days == 1 {
                current.format("%d").to_string()
            } else {
                current.format("%d/%m").to_string()
            };
            let text = Text::new(label)
                .set("x", x)
                .set("y", self.padding + self.header_height - 15)
                .set("font-family", self.font_family.as_str())
                .set("font-size", self.font_size - 1)
                .set("fill", self.text_color.as_str())
                .set("text-anchor", "middle");
            group = group.add(text);

            current += chrono::Duration::days(interval_days);
        }

        group
    }

    fn render_grid(&self, row_count: usize) -> Group {
        let mut group = Group::new().set("class", "grid");
        let chart_top = self.padding + self.header_height;

        for i in 0..=row_count {
            let y = chart_top + (i as u32 * self.row_height);
            let line = Line::new()
                .set("x1", self.padding)
                .set("y1", y)
                .set("x2", self.padding + self.label_width + self.chart_width)
                .set("y2", y)
                .set("stroke", self.grid_color.as_str())
                .set("stroke-width", 1);
            group = group.add(line);
        }

        group
    }

    fn render_row(&self, row: &TimelineRow, index: usize, range_start: NaiveDate, px_per_day: f64) -> Group {
        let mut group = Group::new()
            .set("class", "sample")
            .set("data-status", row.classification.as_str());

        let y = self.padding + self.header_height + (index as u32 * self.row_height);
        let bar_height = (self.row_height as f64 * 0.6) as u32;
        let bar_y = y + (self.row_height - bar_height) / 2;

        let label = Text::new(truncate(&row.row_key, 18))
            .set("x", self.padding + 8)
            .set("y", y + self.row_height / 2 + 4)
            .set("font-family", self.font_family.as_str())
            .set("font-size", self.font_size)
            .set("fill", self.text_color.as_str());
        group = group.add(label);

        let x_start = self.date_to_x(row.start.min(row.end), range_start, px_per_day);
        let x_end = self.date_to_x(row.end.max(row.start), range_start, px_per_day);
        let bar_width = (x_end - x_start).max(4.0);

        let bar = Rectangle::new()
            .set("x", x_start)
            .set("y", bar_y)
            .set("width", bar_width)
            .set("height", bar_height)
            .set("rx", 3)
            .set("ry", 3)
            .set("fill", self.color_for(row.classification));
        group = group.add(bar);

        group
    }

    /// Vertical marker at the reference date
    fn render_today(&self, today: NaiveDate, range_start: NaiveDate, px_per_day: f64, row_count: usize) -> Line {
        let x = self.date_to_x(today, range_start, px_per_day);
        let top = self.padding + self.header_height;
        Line::new()
            .set("class", "today")
            .set("x1", x)
            .set("y1", top)
            .set("x2", x)
            .set("y2", top + row_count as u32 * self.row_height)
            .set("stroke", self.today_color.as_str())
            .set("stroke-width", 2)
            .set("stroke-dasharray", "4 3")
    }

    fn render_legend(&self, y_offset: u32) -> Group {
        let mut group = Group::new().set("class", "legend");
        let x_start = self.padding as f64;
        let y = y_offset as f64 + 15.0;
        let box_size = 12.0;
        let spacing = 120.0;

        for (i, status) in TimelineStatus::ALL.iter().enumerate() {
            let x = x_start + spacing * i as f64;
            let swatch = Rectangle::new()
                .set("x", x)
                .set("y", y - box_size + 2.0)
                .set("width", box_size)
                .set("height", box_size)
                .set("rx", 2)
                .set("fill", self.color_for(*status));
            group = group.add(swatch);

            let label = Text::new(status.as_str())
                .set("x", x + box_size + 5.0)
                .set("y", y)
                .set("font-family", self.font_family.as_str())
                .set("font-size", self.font_size - 1)
                .set("fill", self.text_color.as_str());
            group = group.add(label);
        }

        group
    }
}

impl Renderer for SvgRenderer {
    type Output = String;

    fn render(&self, view: &DashboardView) -> Result<String, RenderError> {
        let mut rows = view.timeline.clone();
        sort_for_display(&mut rows);

        let (range_start, range_end) =
            date_range(&rows).ok_or_else(|| RenderError::InvalidData("No timeline rows to render".into()))?;
        let px_per_day = self.pixels_per_day(range_start, range_end);
        let row_count = rows.len();

        let width = self.total_width();
        let height = self.total_height(row_count) + 30;

        let mut document = Document::new()
            .set("width", width)
            .set("height", height)
            .set("viewBox", (0, 0, width, height))
            .set("xmlns", "http://www.w3.org/2000/svg");

        let background = Rectangle::new()
            .set("width", "100%")
            .set("height", "100%")
            .set("fill", self.background_color.as_str());
        document = document.add(background);

        let title = Text::new(view.title.as_str())
            .set("x", self.padding)
            .set("y", self.padding + 15)
            .set("font-family", self.font_family.as_str())
            .set("font-size", self.font_size + 4)
            .set("font-weight", "bold")
            .set("fill", self.text_color.as_str());
        document = document.add(title);

        document = document.add(self.render_grid(row_count));
        document = document.add(self.render_header(range_start, range_end, px_per_day));

        for (index, row) in rows.iter().enumerate() {
            document = document.add(self.render_row(row, index, range_start, px_per_day));
        }

        if (range_start..=range_end).contains(&view.reference_now) {
            document = document.add(self.render_today(view.reference_now, range_start, px_per_day, row_count));
        }

        let legend_y = self.padding + self.header_height + (row_count as u32 * self.row_height) + 10;
        document = document.add(self.render_legend(legend_y));

        let mut output = Vec::new();
        svg::write(&mut output, &document).map_err(|e| RenderError::Format(format!("Failed to write SVG: {e}")))?;

        String::from_utf8(output).map_err(|e| RenderError::Format(format!("Invalid UTF-8: {e}")))
    }
}

/// Truncate to a maximum number of characters with an ellipsis
fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{kept}...")
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn svg_renderer_creation() {
        let renderer = SvgRenderer::new();
        assert_eq!(renderer.chart_width, 800);
        assert_eq!(renderer.row_height, 24);
    }

    #[test]
    fn svg_renderer_with_config() {
        let renderer = SvgRenderer::new().chart_width(1000).row_height(40);
        assert_eq!(renderer.chart_width, 1000);
        assert_eq!(renderer.row_height, 40);
    }

    #[test]
    fn svg_render_produces_valid_svg() {
        let svg = SvgRenderer::new().render(&fixtures::view()).unwrap();
        assert!(svg.starts_with("<svg"));
        assert!(svg.contains("</svg>"));
        assert!(svg.contains("B-01"));
        assert!(svg.contains("B-03"));
        // no deadline, not on the timeline
        assert!(!svg.contains("B-04"));
    }

    #[test]
    fn svg_colors_follow_classification() {
        let renderer = SvgRenderer::new();
        let svg = renderer.render(&fixtures::view()).unwrap();
        assert!(svg.contains(&renderer.completed_color));
        assert!(svg.contains(&renderer.overdue_color));
        assert!(svg.contains(&renderer.in_analysis_color));
        assert!(svg.contains("class=\"today\""));
    }

    #[test]
    fn svg_render_empty_timeline_fails() {
        let result = SvgRenderer::new().render(&fixtures::empty_view());
        assert!(matches!(result, Err(RenderError::InvalidData(_))));
    }

    #[test]
    fn truncate_counts_characters() {
        assert_eq!(truncate("Short", 20), "Short");
        assert_eq!(truncate("Análise de solo completa", 10), "Análise...");
    }
}
