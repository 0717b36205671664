//! Shared normalization helpers. Each source's normalize function composes
//! these; none of them can fail.

pub mod dates;
pub mod heuristics;
pub mod salary;

pub use dates::{parse_posted_at, parse_posted_at_from};
pub use heuristics::{classify_remote, infer_experience_level, infer_job_type};
pub use salary::{SalaryRange, SingleFigure};

pub const DEFAULT_LOCATION: &str = "Remote";
pub const DEFAULT_CURRENCY: &str = "USD";

/// Trimmed text, or `fallback` when blank.
pub fn or_default(value: Option<&str>, fallback: &str) -> String {
    match value.map(str::trim) {
        Some(v) if !v.is_empty() => v.to_string(),
        _ => fallback.to_string(),
    }
}
