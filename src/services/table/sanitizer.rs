use super::types::ParsedTable;

/// Markdown emphasis markers removed from every cell.
const EMPHASIS_MARKER: char = '*';

/// Drops bold/italic markers and surrounding whitespace. Applying it twice changes nothing.
pub fn sanitize_cell(cell: &str) -> String {
    cell.replace(EMPHASIS_MARKER, "").trim().to_string()
}

pub fn sanitize_table(table: ParsedTable) -> ParsedTable {
    table.map_cells(sanitize_cell)
}
