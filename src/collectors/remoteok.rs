use std::time::Duration;

use async_trait::async_trait;
use chrono::DateTime;
use serde_json::Value;

use crate::collectors::{CollectError, CollectorDeps, JobCollector, RawListing};
use crate::fetcher::FetchOptions;
use crate::models::job::{JobDraft, RemoteType};
use crate::models::source::JobSource;
use crate::normalize::{
    self, DEFAULT_CURRENCY, DEFAULT_LOCATION, SalaryRange, SingleFigure, infer_experience_level,
    infer_job_type,
};

pub const NAME: &str = "RemoteOK";
const DEFAULT_API_PATH: &str = "/api";

#[derive(Debug, Clone, PartialEq)]
pub enum SalaryField {
    Text(String),
    Range { min: Option<i32>, max: Option<i32> },
}

/// One entry of the RemoteOK API array.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RemoteOkListing {
    pub id: String,
    pub position: String,
    pub company: String,
    pub location: Option<String>,
    pub description: Option<String>,
    pub tags: Vec<String>,
    pub url: Option<String>,
    pub salary: Option<SalaryField>,
    pub date: Option<String>,
    pub epoch: Option<i64>,
}

impl RemoteOkListing {
    /// Parse one array entry. Entries without a `position` are not jobs
    /// (the API leads with a legal notice object) and yield `None`.
    pub fn from_value(raw: &Value) -> Option<Self> {
        let position = str_field(raw, "position").filter(|p| !p.trim().is_empty())?;

        let id = raw
            .get("id")
            .and_then(scalar_to_string)
            .or_else(|| str_field(raw, "slug"))
            .unwrap_or_default();

        let tags = raw
            .get("tags")
            .and_then(|v| v.as_array())
            .map(|tags| {
                tags.iter()
                    .filter_map(|t| t.as_str())
                    .map(|t| t.trim().to_string())
                    .filter(|t| !t.is_empty())
                    .collect()
            })
            .unwrap_or_default();

        Some(Self {
            id,
            position: position.trim().to_string(),
            company: str_field(raw, "company").unwrap_or_default(),
            location: str_field(raw, "location"),
            description: str_field(raw, "description"),
            tags,
            url: str_field(raw, "url").or_else(|| str_field(raw, "apply_url")),
            salary: extract_salary(raw),
            date: str_field(raw, "date"),
            epoch: raw.get("epoch").and_then(|v| v.as_i64()),
        })
    }
}

fn str_field(raw: &Value, key: &str) -> Option<String> {
    raw.get(key).and_then(|v| v.as_str()).map(String::from)
}

fn scalar_to_string(v: &Value) -> Option<String> {
    match v {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn int_field(raw: &Value, key: &str) -> Option<i32> {
    raw.get(key)
        .and_then(|v| v.as_f64())
        .filter(|v| *v > 0.0 && *v <= i32::MAX as f64)
        .map(|v| v as i32)
}

fn extract_salary(raw: &Value) -> Option<SalaryField> {
    match raw.get("salary") {
        Some(Value::String(text)) => return Some(SalaryField::Text(text.clone())),
        Some(obj @ Value::Object(_)) => {
            return Some(SalaryField::Range {
                min: int_field(obj, "min"),
                max: int_field(obj, "max"),
            });
        }
        _ => {}
    }

    let min = int_field(raw, "salary_min");
    let max = int_field(raw, "salary_max");
    (min.is_some() || max.is_some()).then_some(SalaryField::Range { min, max })
}

/// Parse the API body. Anything other than a JSON array yields no listings.
pub fn parse_listings(body: &str) -> Vec<RawListing> {
    let data: Value = match serde_json::from_str(body) {
        Ok(v) => v,
        Err(e) => {
            tracing::warn!("{NAME} returned a non-JSON body: {e}");
            return Vec::new();
        }
    };

    let Some(entries) = data.as_array() else {
        tracing::info!("No jobs found from {NAME}: response is not an array");
        return Vec::new();
    };

    entries
        .iter()
        .filter_map(RemoteOkListing::from_value)
        .map(RawListing::RemoteOk)
        .collect()
}

/// RemoteOK only lists remote roles, and its salary text is trusted only
/// when it states a range.
pub fn normalize(listing: RemoteOkListing) -> JobDraft {
    let description = listing.description.unwrap_or_default();

    let salary = match &listing.salary {
        Some(SalaryField::Text(text)) => {
            SalaryRange::from_text(Some(text.as_str()), SingleFigure::Discard)
        }
        Some(SalaryField::Range { min, max }) => SalaryRange::from_bounds(*min, *max),
        None => SalaryRange::default(),
    };

    let posted_at = match (&listing.date, listing.epoch) {
        (Some(date), _) if !date.trim().is_empty() => normalize::parse_posted_at(date),
        (_, Some(epoch)) => {
            DateTime::from_timestamp(epoch, 0).unwrap_or_else(chrono::Utc::now)
        }
        _ => chrono::Utc::now(),
    };

    JobDraft {
        job_type: infer_job_type(&listing.position, &description),
        experience_level: infer_experience_level(&listing.position, &description),
        remote_type: RemoteType::Remote,
        title: listing.position,
        company: listing.company.trim().to_string(),
        location: normalize::or_default(listing.location.as_deref(), DEFAULT_LOCATION),
        description,
        tags: listing.tags,
        source_job_id: listing.id,
        apply_url: listing.url.unwrap_or_default(),
        salary_min: salary.min,
        salary_max: salary.max,
        salary_currency: DEFAULT_CURRENCY.to_string(),
        posted_at,
    }
}

pub struct RemoteOk {
    deps: CollectorDeps,
}

impl RemoteOk {
    pub fn new(deps: CollectorDeps) -> Self {
        Self { deps }
    }

    fn api_url(source: &JobSource) -> String {
        source
            .api_endpoint
            .clone()
            .filter(|e| !e.trim().is_empty())
            .unwrap_or_else(|| {
                format!("{}{DEFAULT_API_PATH}", source.base_url.trim_end_matches('/'))
            })
    }
}

#[async_trait]
impl JobCollector for RemoteOk {
    fn name(&self) -> &str {
        NAME
    }

    async fn discover(&self, source: &JobSource) -> Result<Vec<RawListing>, CollectError> {
        let url = Self::api_url(source);
        let body = self
            .deps
            .fetch_paced(&url, &FetchOptions::json(), Duration::ZERO)
            .await?;
        let listings = parse_listings(&body);
        tracing::info!("{NAME}: {} listings from {url}", listings.len());
        Ok(listings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::job::{ExperienceLevel, JobType};
    use chrono::{TimeZone, Utc};
    use serde_json::json;

    #[test]
    fn filters_entries_without_position() {
        let body = json!([
            { "legal": "API Terms of Service" },
            { "id": 101, "position": "Senior Rust Engineer", "company": "Acme" },
            { "id": "102", "position": "   ", "company": "Blank" },
            { "id": "103", "position": "Designer", "company": "Studio" }
        ])
        .to_string();

        let listings = parse_listings(&body);
        let ids: Vec<&str> = listings.iter().map(|l| l.native_id()).collect();
        assert_eq!(ids, vec!["101", "103"]);
    }

    #[test]
    fn non_array_bodies_yield_nothing() {
        assert!(parse_listings(r#"{"error": "rate limited"}"#).is_empty());
        assert!(parse_listings("<html>blocked</html>").is_empty());
    }

    #[test]
    fn normalizes_full_entry() {
        let raw = json!({
            "id": "555",
            "position": "Senior Backend Engineer",
            "company": "Acme",
            "location": "Worldwide",
            "description": "<p>Contract role, Rust and Postgres</p>",
            "tags": ["rust", "postgres", ""],
            "url": "https://remoteok.io/remote-jobs/555",
            "salary": "$120,000 - $150,000",
            "date": "2025-05-01T10:00:00+00:00"
        });
        let listing = RemoteOkListing::from_value(&raw).unwrap();
        let draft = normalize(listing);

        assert_eq!(draft.title, "Senior Backend Engineer");
        assert_eq!(draft.location, "Worldwide");
        assert_eq!(draft.tags, vec!["rust", "postgres"]);
        assert_eq!(draft.source_job_id, "555");
        assert_eq!(draft.salary_min, Some(120_000));
        assert_eq!(draft.salary_max, Some(150_000));
        assert_eq!(draft.job_type, JobType::Contract);
        assert_eq!(draft.experience_level, ExperienceLevel::Senior);
        assert_eq!(draft.remote_type, RemoteType::Remote);
        assert_eq!(
            draft.posted_at,
            Utc.with_ymd_and_hms(2025, 5, 1, 10, 0, 0).unwrap()
        );
    }

    #[test]
    fn salary_variants() {
        let single = RemoteOkListing::from_value(&json!({
            "position": "Dev", "salary": "$95,000"
        }))
        .unwrap();
        let draft = normalize(single);
        assert_eq!((draft.salary_min, draft.salary_max), (None, None));

        let structured = RemoteOkListing::from_value(&json!({
            "position": "Dev", "salary": { "min": 70000, "max": 90000 }
        }))
        .unwrap();
        let draft = normalize(structured);
        assert_eq!((draft.salary_min, draft.salary_max), (Some(70_000), Some(90_000)));

        let numeric = RemoteOkListing::from_value(&json!({
            "position": "Dev", "salary_min": 60000, "salary_max": 0
        }))
        .unwrap();
        let draft = normalize(numeric);
        assert_eq!((draft.salary_min, draft.salary_max), (Some(60_000), None));
    }

    #[test]
    fn sparse_entry_gets_defaults() {
        let listing = RemoteOkListing::from_value(&json!({ "position": "Dev", "epoch": 1_700_000_000 }))
            .unwrap();
        let draft = normalize(listing);

        assert_eq!(draft.company, "");
        assert_eq!(draft.location, "Remote");
        assert_eq!(draft.description, "");
        assert!(draft.tags.is_empty());
        assert_eq!(draft.source_job_id, "");
        assert_eq!(draft.apply_url, "");
        assert_eq!(draft.salary_currency, "USD");
        assert_eq!(draft.job_type, JobType::FullTime);
        assert_eq!(draft.experience_level, ExperienceLevel::Mid);
        assert_eq!(draft.posted_at.timestamp(), 1_700_000_000);
    }

    #[test]
    fn api_url_prefers_endpoint() {
        let mut source = JobSource::new(1, NAME, "https://remoteok.io/", None);
        assert_eq!(RemoteOk::api_url(&source), "https://remoteok.io/api");
        source.api_endpoint = Some("https://remoteok.com/api?tag=rust".into());
        assert_eq!(RemoteOk::api_url(&source), "https://remoteok.com/api?tag=rust");
    }
}
