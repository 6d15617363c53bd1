use super::scanner::split_cells;
use super::types::{ParsedTable, TableRow, COLUMN_COUNT};

/// Header, separator and at least one data line.
pub const MIN_CANDIDATE_LINES: usize = 3;

/// Builds a table from candidate lines: the first is the header, the second is a
/// separator that is dropped unread, the rest are data rows.
///
/// Returns `None` when there are fewer than [`MIN_CANDIDATE_LINES`] lines; callers then
/// fall back to rendering the raw text. Cell contents are not validated here.
pub fn assemble<'a, I>(candidates: I) -> Option<ParsedTable>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut lines = candidates.into_iter();

    let header = to_cells(lines.next()?)?;
    lines.next()?;

    let rows: Vec<TableRow> = lines.filter_map(to_cells).map(TableRow::new).collect();
    if rows.is_empty() {
        return None;
    }

    Some(ParsedTable::new(header, rows))
}

fn to_cells(line: &str) -> Option<[String; COLUMN_COUNT]> {
    <[String; COLUMN_COUNT]>::try_from(split_cells(line)).ok()
}
