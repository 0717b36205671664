//! Keyword classification shared by all sources. Matching is a
//! case-insensitive substring search and the first rule that hits wins.

use crate::models::job::{ExperienceLevel, JobType, RemoteType};

const JOB_TYPE_RULES: &[(&[&str], JobType)] = &[
    (&["part-time"], JobType::PartTime),
    (&["contract"], JobType::Contract),
    (&["freelance"], JobType::Freelance),
    (&["internship"], JobType::Internship),
];

const EXPERIENCE_RULES: &[(&[&str], ExperienceLevel)] = &[
    (&["senior", "staff"], ExperienceLevel::Senior),
    (&["lead", "principal"], ExperienceLevel::Lead),
    (&["junior"], ExperienceLevel::Junior),
    (&["entry", "intern"], ExperienceLevel::Entry),
];

fn haystack(parts: &[&str]) -> String {
    parts.join(" ").to_lowercase()
}

fn first_match<T: Copy>(text: &str, rules: &[(&[&str], T)]) -> Option<T> {
    rules
        .iter()
        .find(|(keywords, _)| keywords.iter().any(|k| text.contains(k)))
        .map(|(_, value)| *value)
}

pub fn infer_job_type(title: &str, description: &str) -> JobType {
    first_match(&haystack(&[title, description]), JOB_TYPE_RULES).unwrap_or_default()
}

pub fn infer_experience_level(title: &str, description: &str) -> ExperienceLevel {
    first_match(&haystack(&[title, description]), EXPERIENCE_RULES).unwrap_or_default()
}

/// Classify a listing from a general-purpose board.
pub fn classify_remote(
    title: &str,
    description: &str,
    location: &str,
    fallback: RemoteType,
) -> RemoteType {
    let text = haystack(&[title, description, location]);
    if text.contains("remote") || text.contains("work from home") {
        RemoteType::Remote
    } else if text.contains("hybrid") {
        RemoteType::Hybrid
    } else {
        fallback
    }
}
