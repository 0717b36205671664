use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use scraper::{ElementRef, Html};
use sha2::{Digest, Sha256};

use crate::collectors::html::{
    self, all_texts, block_text, first_attr, first_text, inline_text, last_segment, resolve_url,
};
use crate::collectors::{
    CollectError, CollectorDeps, JobCollector, RawListing, SourceDefaults, SourceSettings,
    dedupe_by_id, enrich_each,
};
use crate::fetcher::FetchOptions;
use crate::models::job::{JobDraft, RemoteType};
use crate::models::source::JobSource;
use crate::normalize::{
    self, DEFAULT_CURRENCY, DEFAULT_LOCATION, SalaryRange, SingleFigure, classify_remote,
    infer_experience_level, infer_job_type,
};

pub const NAME: &str = "RemoteYeah";

pub const DEFAULTS: SourceDefaults = SourceDefaults {
    category_delay: Duration::ZERO,
    detail_delay: Duration::from_secs(1),
    detail_fetch_cap: 100,
};

/// Tried in order; the first one producing a usable card wins.
const CARD_SELECTORS: &[&str] = &[
    ".job-card",
    "[data-job-id]",
    ".job-listing",
    ".job-item",
    ".job",
    ".position",
    ".listing",
    ".card",
    ".item",
    "[class*=\"job\"]",
    "[class*=\"position\"]",
    "[class*=\"listing\"]",
    "div[class*=\"job\"]",
    "div[class*=\"position\"]",
    "div[class*=\"listing\"]",
];

const TITLE_SELECTOR: &str = ".job-title, h2, h3, .title, .job-name";
const JOB_LINK_SELECTOR: &str = "a[href*=\"/jobs/\"]";
const COMPANY_SELECTOR: &str = ".company-name, .company, .employer";
const LOCATION_SELECTOR: &str = ".location, .job-location, .job-location-text";
const SALARY_SELECTOR: &str = ".salary, .compensation, .salary-range";
const DATE_SELECTOR: &str =
    ".posted-date, .date, time, .job-date, .time-ago, .ago, [class*=\"date\"], [class*=\"time\"]";
const CARD_TAG_SELECTOR: &str = ".skills .skill, .tags .tag, .technologies .tech, .skill-tag";
const DETAIL_TAG_SELECTOR: &str = ".skills .skill, .tags .tag, .technologies .tech";

const FALLBACK_COMPANY: &str = "Unknown";
const EXCLUDED_LINK_TEXT: &[&str] = &["home", "about", "contact", "login", "sign up"];
const JOB_KEYWORDS: &[&str] = &[
    "engineer",
    "developer",
    "designer",
    "manager",
    "analyst",
    "specialist",
    "lead",
    "senior",
    "junior",
];

#[derive(Debug, Clone, PartialEq)]
pub struct RemoteYeahListing {
    pub id: String,
    pub title: String,
    pub company: String,
    pub location: String,
    pub salary: Option<String>,
    pub posted: Option<String>,
    pub apply_url: String,
    pub description: String,
    pub tags: Vec<String>,
}

#[derive(Debug, thiserror::Error)]
enum CardError {
    #[error("card has no title")]
    MissingTitle,
    #[error("card '{0}' has no company")]
    MissingCompany(String),
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct JobDetails {
    pub description: String,
    pub tags: Vec<String>,
}

/// Stable id for listings that expose none, derived from their content so
/// that re-running over the same page yields the same key.
fn content_id(parts: &[&str]) -> String {
    let mut hasher = Sha256::new();
    for part in parts {
        hasher.update(part.trim().to_lowercase().as_bytes());
        hasher.update([0u8]);
    }
    let digest = hex::encode(hasher.finalize());
    format!("ry-{}", &digest[..16])
}

fn non_empty(value: String) -> Option<String> {
    (!value.is_empty()).then_some(value)
}

fn parse_card(card: ElementRef<'_>, base_url: &str) -> Result<RemoteYeahListing, CardError> {
    let job_href = first_attr(card, JOB_LINK_SELECTOR, "href");

    let title = non_empty(first_text(card, TITLE_SELECTOR))
        .or_else(|| non_empty(first_text(card, JOB_LINK_SELECTOR)))
        .or_else(|| non_empty(first_text(card, "a")))
        .ok_or(CardError::MissingTitle)?;

    let company = non_empty(first_text(card, COMPANY_SELECTOR))
        .ok_or_else(|| CardError::MissingCompany(title.clone()))?;

    let apply_url = job_href
        .clone()
        .or_else(|| first_attr(card, "a", "href"))
        .map(|href| resolve_url(base_url, &href))
        .unwrap_or_default();

    let element = card.value();
    let id = element
        .attr("data-job-id")
        .or_else(|| element.attr("id"))
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .map(String::from)
        .or_else(|| job_href.as_deref().and_then(last_segment))
        .unwrap_or_else(|| {
            content_id(&[title.as_str(), company.as_str(), apply_url.as_str()])
        });

    let posted = non_empty(first_text(card, DATE_SELECTOR))
        .or_else(|| first_attr(card, "time", "datetime"))
        .or_else(|| first_attr(card, "[datetime]", "datetime"));

    Ok(RemoteYeahListing {
        id,
        title,
        company,
        location: normalize::or_default(
            Some(first_text(card, LOCATION_SELECTOR).as_str()),
            DEFAULT_LOCATION,
        ),
        salary: non_empty(first_text(card, SALARY_SELECTOR)),
        posted,
        apply_url,
        description: String::new(),
        tags: all_texts(card, CARD_TAG_SELECTOR),
    })
}

fn looks_like_job_link(text: &str) -> bool {
    let len = text.chars().count();
    if !(5..=100).contains(&len) {
        return false;
    }
    let lower = text.to_lowercase();
    !EXCLUDED_LINK_TEXT.iter().any(|p| lower.contains(p))
        && JOB_KEYWORDS.iter().any(|k| lower.contains(k))
}

/// Last resort when no card layout matches: treat job-sounding anchors as
/// listings.
fn parse_job_links(document: &Html, base_url: &str) -> Vec<RemoteYeahListing> {
    let Some(anchors) = html::selector("a") else {
        return Vec::new();
    };

    document
        .select(&anchors)
        .filter_map(|anchor| {
            let title = inline_text(anchor);
            if !looks_like_job_link(&title) {
                return None;
            }
            let href = anchor
                .value()
                .attr("href")
                .map(str::trim)
                .filter(|h| !h.is_empty());
            let apply_url = href.map(|h| resolve_url(base_url, h)).unwrap_or_default();
            let id = href
                .filter(|h| h.contains("/jobs/"))
                .and_then(last_segment)
                .unwrap_or_else(|| content_id(&[title.as_str(), apply_url.as_str()]));

            tracing::debug!("{NAME}: job link fallback matched {title:?}");
            Some(RemoteYeahListing {
                id,
                title,
                company: FALLBACK_COMPANY.to_string(),
                location: DEFAULT_LOCATION.to_string(),
                salary: None,
                posted: None,
                apply_url,
                description: String::new(),
                tags: Vec::new(),
            })
        })
        .collect()
}

/// Extract listings from the landing page.
pub fn parse_listing_page(body: &str, base_url: &str) -> Vec<RemoteYeahListing> {
    let document = Html::parse_document(body);

    for css in CARD_SELECTORS {
        let Some(sel) = html::selector(css) else {
            continue;
        };

        let mut listings = Vec::new();
        for card in document.select(&sel) {
            match parse_card(card, base_url) {
                Ok(listing) => listings.push(listing),
                Err(e) => tracing::debug!("{NAME}: skipping element for {css}: {e}"),
            }
        }

        if !listings.is_empty() {
            tracing::debug!("{NAME}: {} cards matched {css}", listings.len());
            return listings;
        }
    }

    parse_job_links(&document, base_url)
}

pub fn parse_detail_page(body: &str) -> JobDetails {
    let document = Html::parse_document(body);
    let root = document.root_element();

    let text_of = |css: &str| {
        html::selector(css)
            .and_then(|sel| {
                root.select(&sel)
                    .map(block_text)
                    .find(|t| !t.is_empty())
            })
            .unwrap_or_default()
    };

    let description = non_empty(text_of(".job-description, .description, .content"))
        .unwrap_or_else(|| text_of(".job-details"));

    JobDetails {
        description,
        tags: all_texts(root, DETAIL_TAG_SELECTOR),
    }
}

fn merge_tags(mut tags: Vec<String>, extra: Vec<String>) -> Vec<String> {
    for tag in extra {
        if !tags.iter().any(|t| t.eq_ignore_ascii_case(&tag)) {
            tags.push(tag);
        }
    }
    tags
}

/// RemoteYeah mixes remote and hybrid roles, so the remote type is
/// classified from the text; a lone salary figure becomes both bounds.
pub fn normalize(listing: RemoteYeahListing) -> JobDraft {
    let salary = SalaryRange::from_text(listing.salary.as_deref(), SingleFigure::BothBounds);
    let posted_at = listing
        .posted
        .as_deref()
        .map(normalize::parse_posted_at)
        .unwrap_or_else(Utc::now);

    JobDraft {
        job_type: infer_job_type(&listing.title, &listing.description),
        experience_level: infer_experience_level(&listing.title, &listing.description),
        remote_type: classify_remote(
            &listing.title,
            &listing.description,
            &listing.location,
            RemoteType::Remote,
        ),
        location: normalize::or_default(Some(listing.location.as_str()), DEFAULT_LOCATION),
        title: listing.title,
        company: listing.company,
        description: listing.description,
        tags: listing.tags,
        source_job_id: listing.id,
        apply_url: listing.apply_url,
        salary_min: salary.min,
        salary_max: salary.max,
        salary_currency: DEFAULT_CURRENCY.to_string(),
        posted_at,
    }
}

pub struct RemoteYeah {
    deps: CollectorDeps,
}

impl RemoteYeah {
    pub fn new(deps: CollectorDeps) -> Self {
        Self { deps }
    }

    fn settings(&self, source: &JobSource) -> SourceSettings {
        SourceSettings::resolve(source, &self.deps.overrides, DEFAULTS)
    }

    async fn with_details(
        &self,
        mut listing: RemoteYeahListing,
        delay: Duration,
    ) -> RemoteYeahListing {
        if listing.apply_url.is_empty() || self.deps.pacer.stopping() {
            return listing;
        }

        match self
            .deps
            .fetch_paced(&listing.apply_url, &FetchOptions::default(), delay)
            .await
        {
            Ok(body) => {
                let details = parse_detail_page(&body);
                listing.description = details.description;
                listing.tags = merge_tags(listing.tags, details.tags);
            }
            Err(e) => {
                tracing::warn!("{NAME}: details unavailable for {}: {e}", listing.id);
            }
        }
        listing
    }
}

#[async_trait]
impl JobCollector for RemoteYeah {
    fn name(&self) -> &str {
        NAME
    }

    async fn discover(&self, source: &JobSource) -> Result<Vec<RawListing>, CollectError> {
        let url = source.base_url.clone();
        let body = self
            .deps
            .fetch_paced(&url, &FetchOptions::default(), Duration::ZERO)
            .await?;
        let listings = parse_listing_page(&body, &source.base_url);
        let unique = dedupe_by_id(listings, |l| l.id.as_str());

        if unique.is_empty() {
            tracing::info!("No jobs found on {NAME}");
        } else {
            tracing::info!("{NAME}: {} unique listings from {url}", unique.len());
        }
        Ok(unique.into_iter().map(RawListing::RemoteYeah).collect())
    }

    async fn enrich(&self, source: &JobSource, listings: Vec<RawListing>) -> Vec<RawListing> {
        let settings = self.settings(source);
        if listings.len() > settings.detail_fetch_cap {
            tracing::info!(
                "{NAME}: keeping the first {} of {} listings",
                settings.detail_fetch_cap,
                listings.len()
            );
        }

        let capped: Vec<RawListing> = listings
            .into_iter()
            .take(settings.detail_fetch_cap)
            .collect();

        let delay = settings.detail_delay;
        enrich_each(capped, settings.detail_concurrency, move |raw| async move {
            match raw {
                RawListing::RemoteYeah(listing) => {
                    RawListing::RemoteYeah(self.with_details(listing, delay).await)
                }
                other => other,
            }
        })
        .await
    }
}
