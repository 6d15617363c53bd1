use rust_xlsxwriter::{Color, Format, FormatAlign, FormatPattern};

use crate::services::risk::RiskLevel;

const HEADER_FILL: u32 = 0x366092;
const HIGH_RISK_FILL: u32 = 0xFFB6C1;
const MEDIUM_RISK_FILL: u32 = 0xFFFFE0;
const LOW_RISK_FILL: u32 = 0xE6FFE6;

pub fn header() -> Format {
    Format::new()
        .set_bold()
        .set_font_color(Color::White)
        .set_background_color(Color::RGB(HEADER_FILL))
        .set_pattern(FormatPattern::Solid)
        .set_align(FormatAlign::Center)
}

pub fn summary_cell() -> Format {
    Format::new().set_align(FormatAlign::Left)
}

pub fn story_cell() -> Format {
    Format::new()
        .set_align(FormatAlign::Left)
        .set_align(FormatAlign::Top)
        .set_text_wrap()
}

pub fn risk_fill(level: RiskLevel) -> Option<u32> {
    match level {
        RiskLevel::High => Some(HIGH_RISK_FILL),
        RiskLevel::Medium => Some(MEDIUM_RISK_FILL),
        RiskLevel::Low => Some(LOW_RISK_FILL),
        RiskLevel::Unclassified => None,
    }
}

/// Story cell format with the fill for `level`, or `None` when the level is unclassified.
pub fn risk_cell(level: RiskLevel) -> Option<Format> {
    risk_fill(level).map(|rgb| {
        story_cell()
            .set_background_color(Color::RGB(rgb))
            .set_pattern(FormatPattern::Solid)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unclassified_rows_get_no_fill() {
        assert_eq!(risk_fill(RiskLevel::High), Some(0xFFB6C1));
        assert_eq!(risk_fill(RiskLevel::Medium), Some(0xFFFFE0));
        assert_eq!(risk_fill(RiskLevel::Low), Some(0xE6FFE6));
        assert!(risk_cell(RiskLevel::Unclassified).is_none());
        assert!(risk_cell(RiskLevel::High).is_some());
    }
}
