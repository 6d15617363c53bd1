use serde::Serialize;
use thiserror::Error;

use crate::services::table::{ParsedTable, RISK_COLUMN};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RiskLevel {
    High,
    Medium,
    Low,
    Unclassified,
}

impl RiskLevel {
    /// Case-insensitive substring match, checked in High, Medium, Low order.
    pub fn classify(value: &str) -> Self {
        let value = value.to_lowercase();
        if value.contains("high") {
            RiskLevel::High
        } else if value.contains("medium") {
            RiskLevel::Medium
        } else if value.contains("low") {
            RiskLevel::Low
        } else {
            RiskLevel::Unclassified
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("table has no \"Risk Level\" column")]
pub struct MissingRiskColumn;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RiskCounts {
    pub total: usize,
    pub high: usize,
    pub medium: usize,
    pub low: usize,
    pub unclassified: usize,
}

impl RiskCounts {
    pub fn record(&mut self, level: RiskLevel) {
        self.total += 1;
        match level {
            RiskLevel::High => self.high += 1,
            RiskLevel::Medium => self.medium += 1,
            RiskLevel::Low => self.low += 1,
            RiskLevel::Unclassified => self.unclassified += 1,
        }
    }
}

pub fn aggregate(table: &ParsedTable) -> Result<RiskCounts, MissingRiskColumn> {
    let column = table.column_index(RISK_COLUMN).ok_or(MissingRiskColumn)?;

    let mut counts = RiskCounts::default();
    for row in table.rows() {
        counts.record(RiskLevel::classify(row.get(column).unwrap_or_default()));
    }
    Ok(counts)
}

/// Counts for the summary sheet. A missing risk column zeroes every counter for
/// this story only.
pub fn aggregate_or_zero(story_id: &str, table: &ParsedTable) -> (RiskCounts, bool) {
    match aggregate(table) {
        Ok(counts) => (counts, true),
        Err(e) => {
            tracing::warn!("Story {}: {}; risk styling disabled", story_id, e);
            (RiskCounts::default(), false)
        }
    }
}
