//! Sheet contents and sizing, computed before anything is handed to the xlsx writer.

use crate::models::StoryExport;
use crate::services::risk::RiskCounts;
use crate::services::table::ParsedTable;

pub const SUMMARY_SHEET_NAME: &str = "Summary";
pub const SUMMARY_HEADER: [&str; 6] = [
    "Story ID",
    "Story Title",
    "Total Test Cases",
    "High Risk",
    "Medium Risk",
    "Low Risk",
];
pub const FALLBACK_HEADER: [&str; 3] = ["Story ID", "Story Title", "Test Cases"];

/// The format allows 31 characters; one is kept in reserve.
pub const MAX_SHEET_NAME_CHARS: usize = 30;
/// Longest text a single cell may hold.
pub const MAX_CELL_CHARS: usize = 32_767;
pub const SUMMARY_WIDTH_CAP: usize = 30;
pub const STORY_WIDTH_CAP: usize = 50;
const WIDTH_PADDING: usize = 2;

#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Text(String),
    Number(usize),
}

impl CellValue {
    /// Width of the value as it appears in the sheet, in characters.
    pub fn display_len(&self) -> usize {
        match self {
            CellValue::Text(text) => text.chars().count(),
            CellValue::Number(n) => n.to_string().len(),
        }
    }
}

impl From<&str> for CellValue {
    fn from(value: &str) -> Self {
        CellValue::Text(value.to_string())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SheetKind {
    Summary,
    Story,
    Fallback,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SheetLayout {
    pub kind: SheetKind,
    pub name: String,
    pub header: Vec<String>,
    pub rows: Vec<Vec<CellValue>>,
    /// Column whose cells get a risk fill; `None` disables risk styling.
    pub risk_column: Option<usize>,
}

impl SheetLayout {
    pub fn summary() -> Self {
        Self {
            kind: SheetKind::Summary,
            name: SUMMARY_SHEET_NAME.to_string(),
            header: SUMMARY_HEADER.iter().map(|s| s.to_string()).collect(),
            rows: Vec::new(),
            risk_column: None,
        }
    }

    pub fn push_summary_row(&mut self, story: &StoryExport, counts: &RiskCounts) {
        self.rows.push(vec![
            CellValue::Text(story.id.clone()),
            CellValue::Text(story.title.clone()),
            CellValue::Number(counts.total),
            CellValue::Number(counts.high),
            CellValue::Number(counts.medium),
            CellValue::Number(counts.low),
        ]);
    }

    pub fn story(story_id: &str, table: &ParsedTable, risk_column: Option<usize>) -> Self {
        Self {
            kind: SheetKind::Story,
            name: sheet_name(story_id),
            header: table.header().to_vec(),
            rows: table
                .rows()
                .iter()
                .map(|row| row.cells().iter().map(|cell| CellValue::Text(cell.clone())).collect())
                .collect(),
            risk_column,
        }
    }

    pub fn fallback(story: &StoryExport) -> Self {
        Self {
            kind: SheetKind::Fallback,
            name: sheet_name(&story.id),
            header: FALLBACK_HEADER.iter().map(|s| s.to_string()).collect(),
            rows: vec![vec![
                CellValue::Text(story.id.clone()),
                CellValue::Text(story.title.clone()),
                CellValue::Text(story.raw_text.clone()),
            ]],
            risk_column: None,
        }
    }

    pub fn width_cap(&self) -> usize {
        match self.kind {
            SheetKind::Summary => SUMMARY_WIDTH_CAP,
            SheetKind::Story | SheetKind::Fallback => STORY_WIDTH_CAP,
        }
    }

    pub fn column_widths(&self) -> Vec<usize> {
        column_widths(&self.header, &self.rows, self.width_cap())
    }
}

pub fn sheet_name(story_id: &str) -> String {
    story_id.chars().take(MAX_SHEET_NAME_CHARS).collect()
}

/// `min(longest value in the column + 2, cap)`, header included.
pub fn column_widths(header: &[String], rows: &[Vec<CellValue>], cap: usize) -> Vec<usize> {
    header
        .iter()
        .enumerate()
        .map(|(col, name)| {
            let longest = rows
                .iter()
                .filter_map(|row| row.get(col))
                .map(CellValue::display_len)
                .fold(name.chars().count(), usize::max);
            (longest + WIDTH_PADDING).min(cap)
        })
        .collect()
}
