pub mod assembler;
pub mod sanitizer;
pub mod scanner;
pub mod types;

pub use assembler::assemble;
pub use sanitizer::{sanitize_cell, sanitize_table};
pub use scanner::scan;
pub use types::{ParsedTable, TableRow, COLUMN_COUNT, EXPECTED_HEADER, RISK_COLUMN};

/// Scan, assemble and sanitize in one step. `None` means no usable table was found.
pub fn parse_test_cases(raw: &str) -> Option<ParsedTable> {
    let table = assemble(scan(raw)).map(sanitize_table);
    match &table {
        Some(table) => tracing::debug!("Parsed {} test case rows", table.len()),
        None => tracing::warn!("No valid table found in generator output"),
    }
    table
}
