use std::collections::HashSet;

use rust_xlsxwriter::{Format, Workbook, Worksheet, XlsxError};

use super::layout::{CellValue, SheetKind, SheetLayout, MAX_CELL_CHARS};
use super::styles;
use crate::models::StoryExport;
use crate::services::risk::{RiskCounts, RiskLevel};
use crate::services::table::{ParsedTable, RISK_COLUMN};

/// Collects sheet layouts story by story, then renders them into one workbook.
///
/// Each story contributes its own sheet (and summary row) independently, so a story
/// without a risk column or without a table never blocks the others.
#[derive(Debug, Default)]
pub struct WorkbookBuilder {
    summary: Option<SheetLayout>,
    sheets: Vec<SheetLayout>,
}

impl WorkbookBuilder {
    pub fn new() -> Self {
        Self {
            summary: Some(SheetLayout::summary()),
            sheets: Vec::new(),
        }
    }

    /// A workbook with story sheets only.
    pub fn without_summary() -> Self {
        Self::default()
    }

    /// Adds a story sheet for `table`. `risk_styling` is false when the risk column
    /// could not be classified.
    pub fn add_table(
        &mut self,
        story: &StoryExport,
        table: &ParsedTable,
        counts: &RiskCounts,
        risk_styling: bool,
    ) -> &mut Self {
        let risk_column = if risk_styling {
            table.column_index(RISK_COLUMN)
        } else {
            None
        };
        if let Some(summary) = self.summary.as_mut() {
            summary.push_summary_row(story, counts);
        }
        self.sheets.push(SheetLayout::story(&story.id, table, risk_column));
        self
    }

    /// Adds the three-column raw text sheet used when no table was assembled.
    pub fn add_fallback(&mut self, story: &StoryExport) -> &mut Self {
        if let Some(summary) = self.summary.as_mut() {
            summary.push_summary_row(story, &RiskCounts::default());
        }
        self.sheets.push(SheetLayout::fallback(story));
        self
    }

    /// Sheets in workbook order, summary first.
    pub fn layouts(&self) -> impl Iterator<Item = &SheetLayout> {
        self.summary.iter().chain(self.sheets.iter())
    }

    pub fn sheet_count(&self) -> usize {
        self.layouts().count()
    }

    pub fn build(&self) -> Workbook {
        let mut workbook = Workbook::new();
        let mut used_names = HashSet::new();
        for layout in self.layouts() {
            let worksheet = workbook.add_worksheet();
            claim_sheet_name(worksheet, &layout.name, &mut used_names);
            let failed = render_sheet(worksheet, layout);
            if failed > 0 {
                tracing::warn!("Sheet {} was written with {} failed cells", layout.name, failed);
            }
        }
        workbook
    }
}

/// Names the sheet `wanted` unless the writer rejects it or another sheet already uses
/// it (names compare case-insensitively). Otherwise the sheet keeps a `SheetN` name.
fn claim_sheet_name(worksheet: &mut Worksheet, wanted: &str, used: &mut HashSet<String>) {
    if used.contains(&wanted.to_lowercase()) {
        tracing::warn!("Sheet name {:?} is already taken, keeping default", wanted);
    } else if let Err(e) = worksheet.set_name(wanted) {
        tracing::warn!("Cannot use sheet name {:?}, keeping default: {}", wanted, e);
    }

    let mut name = worksheet.name();
    let mut n = 0;
    while used.contains(&name.to_lowercase()) {
        n += 1;
        name = format!("Sheet{n}");
    }
    if name != worksheet.name() {
        if let Err(e) = worksheet.set_name(name.as_str()) {
            tracing::warn!("Cannot use sheet name {:?}: {}", name, e);
        }
    }
    used.insert(name.to_lowercase());
}

/// Writes headers, rows and column widths. A cell that cannot be written is logged and
/// skipped; returns how many were skipped.
fn render_sheet(worksheet: &mut Worksheet, layout: &SheetLayout) -> usize {
    let mut failed = 0;

    let header_format = styles::header();
    for (col, name) in layout.header.iter().enumerate() {
        if let Err(e) = worksheet.write_string_with_format(0, col as u16, name.as_str(), &header_format) {
            tracing::warn!("Header {:?} of sheet {} not written: {}", name, layout.name, e);
            failed += 1;
        }
    }

    let body_format = match layout.kind {
        SheetKind::Summary => Some(styles::summary_cell()),
        SheetKind::Story => Some(styles::story_cell()),
        SheetKind::Fallback => None,
    };

    for (index, row) in layout.rows.iter().enumerate() {
        let row_num = (index + 1) as u32;
        for (col, value) in row.iter().enumerate() {
            let risk_format = match (layout.risk_column, value) {
                (Some(risk_col), CellValue::Text(text)) if risk_col == col => {
                    styles::risk_cell(RiskLevel::classify(text))
                }
                _ => None,
            };
            let format = risk_format.as_ref().or(body_format.as_ref());
            if let Err(e) = write_cell(worksheet, row_num, col as u16, value, format) {
                tracing::warn!("Cell ({}, {}) of sheet {} not written: {}", row_num, col, layout.name, e);
                failed += 1;
            }
        }
    }

    for (col, width) in layout.column_widths().into_iter().enumerate() {
        if let Err(e) = worksheet.set_column_width(col as u16, width as f64) {
            tracing::warn!("Width of column {} in sheet {} not set: {}", col, layout.name, e);
        }
    }

    failed
}

/// Cuts text to the per-cell character limit of the format.
fn clip_cell_text(text: &str) -> &str {
    match text.char_indices().nth(MAX_CELL_CHARS) {
        Some((end, _)) => {
            tracing::warn!(
                "Cell text of {} characters clipped to {}",
                text.chars().count(),
                MAX_CELL_CHARS
            );
            &text[..end]
        }
        None => text,
    }
}

fn write_cell(
    worksheet: &mut Worksheet,
    row: u32,
    col: u16,
    value: &CellValue,
    format: Option<&Format>,
) -> Result<(), XlsxError> {
    match (value, format) {
        (CellValue::Text(text), Some(format)) => {
            worksheet.write_string_with_format(row, col, clip_cell_text(text), format)?;
        }
        (CellValue::Text(text), None) => {
            worksheet.write_string(row, col, clip_cell_text(text))?;
        }
        (CellValue::Number(n), Some(format)) => {
            worksheet.write_number_with_format(row, col, *n as f64, format)?;
        }
        (CellValue::Number(n), None) => {
            worksheet.write_number(row, col, *n as f64)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::excel::layout::{MAX_CELL_CHARS, MAX_SHEET_NAME_CHARS};
    use crate::services::table::parse_test_cases;

    const RAW: &str = "| Test Case ID | Area/Feature | Description | Steps | Expected Result | Risk Level | Priority |\n\
                       |---|---|---|---|---|---|---|\n\
                       | TC001 | Login | Valid login | Enter creds | Dashboard shown | High | 1 |";

    fn story(id: &str, raw: &str) -> StoryExport {
        StoryExport::from_raw(id, "Title", raw)
    }

    #[test]
    fn summary_comes_first_with_one_row_per_story() {
        let with_table = story("US001", RAW);
        let without_table = story("US002", "no table");
        let table = with_table.table.clone().unwrap();

        let mut builder = WorkbookBuilder::new();
        builder
            .add_table(&with_table, &table, &RiskCounts { total: 1, high: 1, ..Default::default() }, true)
            .add_fallback(&without_table);

        let names: Vec<_> = builder.layouts().map(|l| l.name.as_str()).collect();
        assert_eq!(names, vec!["Summary", "US001", "US002"]);

        let summary = builder.layouts().next().unwrap();
        assert_eq!(summary.rows.len(), 2);
        assert_eq!(summary.rows[1][2], CellValue::Number(0));
    }

    #[test]
    fn risk_styling_follows_flag() {
        let export = story("US001", RAW);
        let table = parse_test_cases(RAW).unwrap();

        let mut styled = WorkbookBuilder::without_summary();
        styled.add_table(&export, &table, &RiskCounts::default(), true);
        assert_eq!(styled.layouts().next().unwrap().risk_column, Some(5));

        let mut plain = WorkbookBuilder::without_summary();
        plain.add_table(&export, &table, &RiskCounts::default(), false);
        assert_eq!(plain.layouts().next().unwrap().risk_column, None);
        assert_eq!(plain.sheet_count(), 1);
    }

    #[test]
    fn long_ids_are_truncated_for_sheet_names() {
        let export = story(&"A".repeat(45), RAW);
        let mut builder = WorkbookBuilder::new();
        builder.add_fallback(&export);
        let names: Vec<_> = builder.layouts().map(|l| l.name.clone()).collect();
        assert_eq!(names[1].len(), MAX_SHEET_NAME_CHARS);
    }

    #[test]
    fn clashing_names_fall_back_to_default() {
        let mut builder = WorkbookBuilder::new();
        builder
            .add_fallback(&story("PROJECT-ALPHA-CHECKOUT-FLOW-STORY-0001", "raw"))
            .add_fallback(&story("PROJECT-ALPHA-CHECKOUT-FLOW-STORY-0002", "raw"))
            .add_fallback(&story("summary", "raw"));
        let mut workbook = builder.build();

        let names: Vec<String> = workbook.worksheets().iter().map(|ws| ws.name()).collect();
        assert_eq!(names, vec!["Summary", "PROJECT-ALPHA-CHECKOUT-FLOW-ST", "Sheet3", "Sheet4"]);
        assert!(workbook.save_to_buffer().is_ok());
    }

    #[test]
    fn story_named_like_a_default_sheet_keeps_names_unique() {
        let mut builder = WorkbookBuilder::without_summary();
        builder
            .add_fallback(&story("Sheet2", "raw"))
            .add_fallback(&story("Sheet2", "raw"));
        let mut workbook = builder.build();

        let names: Vec<String> = workbook.worksheets().iter().map(|ws| ws.name()).collect();
        assert_eq!(names, vec!["Sheet2", "Sheet1"]);
        assert!(workbook.save_to_buffer().is_ok());
    }

    #[test]
    fn oversized_text_is_clipped_to_cell_limit() {
        let text = "é".repeat(MAX_CELL_CHARS + 10);
        assert_eq!(clip_cell_text(&text).chars().count(), MAX_CELL_CHARS);
        assert_eq!(clip_cell_text("short"), "short");

        let mut builder = WorkbookBuilder::without_summary();
        builder.add_fallback(&story("US001", &"x".repeat(40_000)));
        let mut workbook = builder.build();
        assert!(workbook.save_to_buffer().is_ok());
    }

    #[test]
    fn build_renders_every_layout() {
        let mut builder = WorkbookBuilder::new();
        builder.add_fallback(&story("Bad:Name?", "raw"));
        let mut workbook = builder.build();
        assert!(workbook.save_to_buffer().is_ok());
    }
}
