use std::sync::LazyLock;

use regex::Regex;

/// A comma-grouped thousands figure ("120,000") or a bare run of digits.
static DIGIT_RUN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d{1,3}(?:,\d{3})+|\d+").expect("valid regex"));

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SalaryRange {
    pub min: Option<i32>,
    pub max: Option<i32>,
}

/// What to do with salary text that contains a single figure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SingleFigure {
    /// Use it as both bounds ("starting at").
    #[default]
    BothBounds,
    /// Only ranges are trusted.
    Discard,
}

impl SalaryRange {
    pub fn from_bounds(min: Option<i32>, max: Option<i32>) -> Self {
        Self { min, max }
    }

    /// Extract a range from free text. Figures are taken verbatim: no "k"
    /// multiplier or currency conversion.
    pub fn from_text(text: Option<&str>, single: SingleFigure) -> Self {
        let Some(text) = text else {
            return Self::default();
        };

        let runs: Vec<Option<i32>> = DIGIT_RUN
            .find_iter(text)
            .map(|m| m.as_str().replace(',', "").parse::<i32>().ok())
            .collect();

        match (runs.as_slice(), single) {
            ([], _) => Self::default(),
            ([only], SingleFigure::BothBounds) => Self::from_bounds(*only, *only),
            ([_], SingleFigure::Discard) => Self::default(),
            ([first, second, ..], _) => Self::from_bounds(*first, *second),
        }
    }
}
