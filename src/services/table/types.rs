use serde::Serialize;
use serde_json::{Map, Value};

/// Every generated table carries exactly this many columns.
pub const COLUMN_COUNT: usize = 7;

pub const RISK_COLUMN: &str = "Risk Level";

/// Conventional header requested from the generator. Only the column count is enforced.
pub const EXPECTED_HEADER: [&str; COLUMN_COUNT] = [
    "Test Case ID",
    "Area/Feature",
    "Description",
    "Steps",
    "Expected Result",
    RISK_COLUMN,
    "Priority",
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TableRow {
    cells: [String; COLUMN_COUNT],
}

impl TableRow {
    pub fn new(cells: [String; COLUMN_COUNT]) -> Self {
        Self { cells }
    }

    pub fn cells(&self) -> &[String; COLUMN_COUNT] {
        &self.cells
    }

    pub fn get(&self, column: usize) -> Option<&str> {
        self.cells.get(column).map(String::as_str)
    }

    pub(crate) fn map_cells(self, f: impl Fn(&str) -> String) -> Self {
        Self {
            cells: self.cells.map(|cell| f(cell.as_str())),
        }
    }
}

/// A header plus its data rows. Built once by the assembler and never mutated afterwards;
/// the fixed-size arrays keep every row the same width as the header.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParsedTable {
    header: [String; COLUMN_COUNT],
    rows: Vec<TableRow>,
}

impl ParsedTable {
    pub fn new(header: [String; COLUMN_COUNT], rows: Vec<TableRow>) -> Self {
        Self { header, rows }
    }

    pub fn header(&self) -> &[String; COLUMN_COUNT] {
        &self.header
    }

    pub fn rows(&self) -> &[TableRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.header.iter().position(|column| column == name)
    }

    pub fn value(&self, row: usize, column: &str) -> Option<&str> {
        let column = self.column_index(column)?;
        self.rows.get(row)?.get(column)
    }

    /// Rows keyed by header name, the shape returned to API clients.
    pub fn records(&self) -> Vec<Map<String, Value>> {
        self.rows
            .iter()
            .map(|row| {
                self.header
                    .iter()
                    .zip(row.cells())
                    .map(|(name, value)| (name.clone(), Value::String(value.clone())))
                    .collect()
            })
            .collect()
    }

    pub(crate) fn map_cells(self, f: impl Fn(&str) -> String) -> Self {
        Self {
            header: self.header.map(|cell| f(cell.as_str())),
            rows: self.rows.into_iter().map(|row| row.map_cells(&f)).collect(),
        }
    }
}
