//! Line classifier for generator output.
//!
//! A candidate line starts and ends with `|` and holds exactly seven `|`-separated cells.
//! Lines are judged one at a time, so cells that contain `|` or span several lines
//! cannot be recovered; such lines are dropped without an error.

use std::str::Lines;

use once_cell::sync::Lazy;
use regex::Regex;

use super::types::COLUMN_COUNT;

static CANDIDATE_LINE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(r"^\|(?:[^|\r\n]*\|){{{}}}$", COLUMN_COUNT))
        .expect("candidate line pattern is valid")
});

pub fn is_candidate_line(line: &str) -> bool {
    CANDIDATE_LINE.is_match(line.trim())
}

/// Lazy iterator over the candidate lines of a text. A clone walks the remaining lines
/// independently of the iterator it was cloned from.
#[derive(Debug, Clone)]
pub struct CandidateLines<'a> {
    lines: Lines<'a>,
}

impl<'a> Iterator for CandidateLines<'a> {
    type Item = &'a str;

    fn next(&mut self) -> Option<Self::Item> {
        self.lines
            .by_ref()
            .map(str::trim)
            .find(|line| CANDIDATE_LINE.is_match(line))
    }
}

pub fn scan(raw: &str) -> CandidateLines<'_> {
    CandidateLines { lines: raw.lines() }
}

/// Splits a candidate line into its trimmed cells.
pub fn split_cells(line: &str) -> Vec<String> {
    let line = line.trim();
    let inner = line
        .strip_prefix('|')
        .and_then(|rest| rest.strip_suffix('|'))
        .unwrap_or(line);

    inner.split('|').map(|cell| cell.trim().to_string()).collect()
}
