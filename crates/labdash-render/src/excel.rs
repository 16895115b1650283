//! Excel export of a dashboard view
//!
//! Produces a workbook with three sheets:
//! - **Amostras**: the filtered detail table, visible columns only
//! - **Resumo**: row count, quantity, status buckets and filled counts
//! - **Cronograma**: timeline rows with their classification
//!
//! Date cells are written as real Excel dates so the sheet can be re-sorted
//! and filtered by the lab staff.

use chrono::{Datelike, NaiveDate};
use rust_xlsxwriter::{ExcelDateTime, Format, FormatAlign, FormatBorder, Workbook, Worksheet, XlsxError};

use labdash_core::metrics::{Measure, StatusBucket};
use labdash_core::{CellValue, DashboardView, RenderError, Renderer};

/// Excel workbook renderer
#[derive(Clone, Debug)]
pub struct ExcelRenderer {
    /// Number format for date cells
    pub date_format: String,
    /// Include the summary sheet
    pub include_summary: bool,
    /// Include the timeline sheet
    pub include_timeline: bool,
}

impl Default for ExcelRenderer {
    fn default() -> Self {
        Self {
            date_format: "dd/mm/yyyy".into(),
            include_summary: true,
            include_timeline: true,
        }
    }
}

struct ExcelFormats {
    header: Format,
    text: Format,
    number: Format,
    date: Format,
    label: Format,
}

fn xlsx_err(e: XlsxError) -> RenderError {
    RenderError::Format(e.to_string())
}

impl ExcelRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn date_format(mut self, format: impl Into<String>) -> Self {
        self.date_format = format.into();
        self
    }

    /// Only the detail sheet
    pub fn no_summary(mut self) -> Self {
        self.include_summary = false;
        self
    }

    pub fn no_timeline(mut self) -> Self {
        self.include_timeline = false;
        self
    }

    fn create_formats(&self) -> ExcelFormats {
        let header = Format::new()
            .set_bold()
            .set_align(FormatAlign::Center)
            .set_background_color(0x4472C4)
            .set_font_color(0xFFFFFF)
            .set_border(FormatBorder::Thin);
        let text = Format::new().set_border(FormatBorder::Thin);
        let number = Format::new()
            .set_num_format("#,##0.##")
            .set_border(FormatBorder::Thin);
        let date = Format::new()
            .set_num_format(&self.date_format)
            .set_border(FormatBorder::Thin);
        let label = Format::new().set_bold().set_border(FormatBorder::Thin);

        ExcelFormats {
            header,
            text,
            number,
            date,
            label,
        }
    }

    fn write_headers(sheet: &mut Worksheet, headers: &[&str], formats: &ExcelFormats) -> Result<(), RenderError> {
        for (col, header) in headers.iter().enumerate() {
            sheet
                .write_with_format(0, col as u16, *header, &formats.header)
                .map_err(xlsx_err)?;
        }
        sheet.set_freeze_panes(1, 0).ok();
        Ok(())
    }

    fn add_samples_sheet(
        &self,
        workbook: &mut Workbook,
        view: &DashboardView,
        formats: &ExcelFormats,
    ) -> Result<(), RenderError> {
        let sheet = workbook.add_worksheet();
        sheet.set_name("Amostras").map_err(xlsx_err)?;

        let detail = view.detail_table();
        let headers: Vec<&str> = detail.columns().iter().map(String::as_str).collect();
        Self::write_headers(sheet, &headers, formats)?;
        for col in 0..headers.len() {
            sheet.set_column_width(col as u16, 16).ok();
        }

        for row in detail.rows() {
            let r = row.index() as u32 + 1;
            for (col, cell) in row.cells().iter().enumerate() {
                write_cell(sheet, r, col as u16, cell, formats)?;
            }
        }
        Ok(())
    }

    fn add_summary_sheet(
        &self,
        workbook: &mut Workbook,
        view: &DashboardView,
        formats: &ExcelFormats,
    ) -> Result<(), RenderError> {
        let sheet = workbook.add_worksheet();
        sheet.set_name("Resumo").map_err(xlsx_err)?;
        sheet.set_column_width(0, 28).ok();
        sheet.set_column_width(1, 14).ok();
        Self::write_headers(sheet, &["Métrica", "Valor"], formats)?;

        let metrics = &view.metrics;
        let mut lines: Vec<(String, Option<f64>)> = vec![
            ("Amostras exibidas".into(), Some(metrics.displayed_row_count as f64)),
            ("Amostras no registro".into(), Some(view.total_rows as f64)),
            ("Quantidade total".into(), measure(&metrics.total_quantity, |q| *q)),
        ];
        if let Measure::Value(_) = metrics.status_counts {
            for bucket in StatusBucket::ALL {
                let count = metrics.status_count(bucket).unwrap_or(0);
                lines.push((bucket.as_str().to_string(), Some(count as f64)));
            }
        }
        for filled in &metrics.filled_counts {
            lines.push((filled.label.clone(), measure(&filled.count, |c| *c as f64)));
        }

        for (i, (label, value)) in lines.iter().enumerate() {
            let r = i as u32 + 1;
            sheet
                .write_with_format(r, 0, label.as_str(), &formats.label)
                .map_err(xlsx_err)?;
            match value {
                Some(v) => sheet.write_with_format(r, 1, *v, &formats.number),
                None => sheet.write_with_format(r, 1, "n/a", &formats.text),
            }
            .map_err(xlsx_err)?;
        }
        Ok(())
    }

    fn add_timeline_sheet(
        &self,
        workbook: &mut Workbook,
        view: &DashboardView,
        formats: &ExcelFormats,
    ) -> Result<(), RenderError> {
        let sheet = workbook.add_worksheet();
        sheet.set_name("Cronograma").map_err(xlsx_err)?;
        Self::write_headers(sheet, &["Amostra", "Início", "Prazo", "Dias", "Situação"], formats)?;
        sheet.set_column_width(0, 16).ok();
        sheet.set_column_width(1, 12).ok();
        sheet.set_column_width(2, 12).ok();
        sheet.set_column_width(4, 14).ok();

        for (i, row) in view.timeline.iter().enumerate() {
            let r = i as u32 + 1;
            sheet
                .write_with_format(r, 0, row.row_key.as_str(), &formats.text)
                .map_err(xlsx_err)?;
            sheet
                .write_with_format(r, 1, excel_date(row.start)?, &formats.date)
                .map_err(xlsx_err)?;
            sheet
                .write_with_format(r, 2, excel_date(row.end)?, &formats.date)
                .map_err(xlsx_err)?;
            sheet
                .write_with_format(r, 3, row.span_days() as f64, &formats.number)
                .map_err(xlsx_err)?;
            sheet
                .write_with_format(r, 4, row.classification.as_str(), &formats.text)
                .map_err(xlsx_err)?;
        }
        Ok(())
    }

    /// Render the workbook to XLSX bytes
    pub fn render_to_bytes(&self, view: &DashboardView) -> Result<Vec<u8>, RenderError> {
        let mut workbook = Workbook::new();
        let formats = self.create_formats();

        self.add_samples_sheet(&mut workbook, view, &formats)?;
        if self.include_summary {
            self.add_summary_sheet(&mut workbook, view, &formats)?;
        }
        if self.include_timeline {
            self.add_timeline_sheet(&mut workbook, view, &formats)?;
        }

        workbook
            .save_to_buffer()
            .map_err(|e| RenderError::Format(format!("Failed to create Excel: {e}")))
    }
}

impl Renderer for ExcelRenderer {
    type Output = Vec<u8>;

    fn render(&self, view: &DashboardView) -> Result<Vec<u8>, RenderError> {
        self.render_to_bytes(view)
    }
}

fn measure<T>(value: &Measure<T>, f: impl Fn(&T) -> f64) -> Option<f64> {
    value.value().map(f)
}

fn excel_date(date: NaiveDate) -> Result<ExcelDateTime, RenderError> {
    let year = u16::try_from(date.year())
        .map_err(|_| RenderError::InvalidData(format!("Date out of range: {date}")))?;
    ExcelDateTime::from_ymd(year, date.month() as u8, date.day() as u8).map_err(xlsx_err)
}

fn write_cell(
    sheet: &mut Worksheet,
    row: u32,
    col: u16,
    cell: &CellValue,
    formats: &ExcelFormats,
) -> Result<(), RenderError> {
    match cell {
        CellValue::Missing => return Ok(()),
        CellValue::Text(s) => sheet.write_with_format(row, col, s.as_str(), &formats.text),
        CellValue::Number(n) => sheet.write_with_format(row, col, *n, &formats.number),
        // Excel has no dates before 1900
        CellValue::Date(d) => match excel_date(*d) {
            Ok(date) => sheet.write_with_format(row, col, &date, &formats.date),
            Err(_) => sheet.write_with_format(row, col, cell.to_string(), &formats.text),
        },
    }
    .map_err(xlsx_err)?;
    Ok(())
}
