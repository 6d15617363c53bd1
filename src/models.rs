use serde::{Deserialize, Serialize};

use crate::services::table::{parse_test_cases, ParsedTable};

/// One story headed for the workbook. `table` is `None` when no table could be
/// assembled, in which case `raw_text` is rendered as-is.
#[derive(Debug, Clone, PartialEq)]
pub struct StoryExport {
    pub id: String,
    pub title: String,
    pub table: Option<ParsedTable>,
    pub raw_text: String,
}

impl StoryExport {
    pub fn from_raw(id: impl Into<String>, title: impl Into<String>, raw_text: impl Into<String>) -> Self {
        let raw_text = raw_text.into();
        Self {
            id: id.into(),
            title: title.into(),
            table: parse_test_cases(&raw_text),
            raw_text,
        }
    }
}

/// A user story as supplied by clients or bundled as an example.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UserStory {
    pub id: String,
    pub title: String,
    pub story: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_raw_keeps_text_when_no_table() {
        let export = StoryExport::from_raw("US001", "Login", "nothing tabular");
        assert!(export.table.is_none());
        assert_eq!(export.raw_text, "nothing tabular");
    }
}
