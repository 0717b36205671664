use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use scraper::Html;

use crate::collectors::html::{
    self, all_texts, block_text, first_attr, first_text, last_segment, resolve_url,
};
use crate::collectors::{
    CollectError, CollectorDeps, JobCollector, RawListing, SourceDefaults, SourceSettings,
    dedupe_by_id, enrich_each,
};
use crate::fetcher::{FetchError, FetchOptions};
use crate::models::job::{JobDraft, RemoteType};
use crate::models::source::JobSource;
use crate::normalize::{
    self, DEFAULT_CURRENCY, DEFAULT_LOCATION, infer_experience_level, infer_job_type,
};

pub const NAME: &str = "WeWorkRemotely";

/// Category listing pages, fetched in this order.
pub const DEFAULT_CATEGORIES: &[&str] = &[
    "/remote-jobs/all",
    "/remote-jobs/programming",
    "/remote-jobs/design",
    "/remote-jobs/product",
    "/remote-jobs/sales",
    "/remote-jobs/marketing",
    "/remote-jobs/customer-support",
    "/remote-jobs/management",
    "/remote-jobs/quality-assurance",
    "/remote-jobs/writing",
    "/remote-jobs/legal",
    "/remote-jobs/accounting",
    "/remote-jobs/recruiting",
    "/remote-jobs/teaching",
    "/remote-jobs/healthcare",
    "/remote-jobs/operations",
    "/remote-jobs/security",
    "/remote-jobs/consulting",
    "/remote-jobs/engineering",
    "/remote-jobs/executive",
    "/remote-jobs/administration",
    "/remote-jobs/architecture",
    "/remote-jobs/art",
    "/remote-jobs/business",
    "/remote-jobs/content",
    "/remote-jobs/data",
    "/remote-jobs/devops",
    "/remote-jobs/finance",
    "/remote-jobs/game-development",
    "/remote-jobs/human-resources",
    "/remote-jobs/information-technology",
    "/remote-jobs/journalism",
    "/remote-jobs/logistics",
    "/remote-jobs/medical",
    "/remote-jobs/mobile",
    "/remote-jobs/other",
    "/remote-jobs/people",
    "/remote-jobs/plumbing",
    "/remote-jobs/social-media",
    "/remote-jobs/technical-support",
    "/remote-jobs/ux",
];

pub const DEFAULTS: SourceDefaults = SourceDefaults {
    category_delay: Duration::from_secs(1),
    detail_delay: Duration::from_secs(2),
    detail_fetch_cap: 50,
};

#[derive(Debug, Clone, PartialEq)]
pub struct WeWorkRemotelyListing {
    pub id: String,
    pub title: String,
    pub company: String,
    pub location: String,
    pub category: String,
    pub apply_url: String,
    pub posted_at: Option<DateTime<Utc>>,
    pub description: String,
    pub tags: Vec<String>,
}

/// Description and tags from a listing's own page.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct JobDetails {
    pub description: String,
    pub tags: Vec<String>,
}

/// Extract listings from one category page. Items missing a title, a
/// company or a link are skipped.
pub fn parse_category_page(body: &str, base_url: &str) -> Vec<WeWorkRemotelyListing> {
    let document = Html::parse_document(body);
    let (Some(sections), Some(items)) = (html::selector("section.jobs"), html::selector("li"))
    else {
        return Vec::new();
    };

    let mut listings = Vec::new();
    for section in document.select(&sections) {
        let category = first_text(section, "h2");

        for item in section.select(&items) {
            let title = first_text(item, ".title");
            let company = first_text(item, ".company");
            let href = first_attr(item, "a", "href");

            let (Some(href), false, false) = (href, title.is_empty(), company.is_empty()) else {
                tracing::debug!("{NAME}: skipping incomplete listing in '{category}'");
                continue;
            };
            let Some(id) = last_segment(&href) else {
                tracing::debug!("{NAME}: no id in listing href {href:?}");
                continue;
            };

            listings.push(WeWorkRemotelyListing {
                id,
                title,
                company,
                location: normalize::or_default(
                    Some(first_text(item, ".region").as_str()),
                    DEFAULT_LOCATION,
                ),
                category: category.clone(),
                apply_url: resolve_url(base_url, &href),
                posted_at: first_attr(item, "time", "datetime")
                    .map(|d| normalize::parse_posted_at(&d)),
                description: String::new(),
                tags: Vec::new(),
            });
        }
    }
    listings
}

pub fn parse_detail_page(body: &str) -> JobDetails {
    let document = Html::parse_document(body);
    let root = document.root_element();

    let description = html::selector(".listing-container .content")
        .and_then(|sel| root.select(&sel).next().map(block_text))
        .unwrap_or_default();

    JobDetails {
        description,
        tags: all_texts(root, ".listing-container .tags span"),
    }
}

/// WeWorkRemotely is remote-only; salaries are not published in the markup.
pub fn normalize(listing: WeWorkRemotelyListing) -> JobDraft {
    JobDraft {
        job_type: infer_job_type(&listing.title, &listing.description),
        experience_level: infer_experience_level(&listing.title, &listing.description),
        remote_type: RemoteType::Remote,
        location: normalize::or_default(Some(listing.location.as_str()), DEFAULT_LOCATION),
        title: listing.title,
        company: listing.company,
        description: listing.description,
        tags: listing.tags,
        source_job_id: listing.id,
        apply_url: listing.apply_url,
        salary_min: None,
        salary_max: None,
        salary_currency: DEFAULT_CURRENCY.to_string(),
        posted_at: listing.posted_at.unwrap_or_else(Utc::now),
    }
}

pub struct WeWorkRemotely {
    deps: CollectorDeps,
}

impl WeWorkRemotely {
    pub fn new(deps: CollectorDeps) -> Self {
        Self { deps }
    }

    fn settings(&self, source: &JobSource) -> SourceSettings {
        SourceSettings::resolve(source, &self.deps.overrides, DEFAULTS)
    }

    async fn fetch_details(&self, listing: &WeWorkRemotelyListing, delay: Duration) -> JobDetails {
        match self
            .deps
            .fetch_paced(&listing.apply_url, &FetchOptions::default(), delay)
            .await
        {
            Ok(body) => parse_detail_page(&body),
            Err(e) => {
                tracing::warn!("{NAME}: details unavailable for {}: {e}", listing.id);
                JobDetails::default()
            }
        }
    }
}

#[async_trait]
impl JobCollector for WeWorkRemotely {
    fn name(&self) -> &str {
        NAME
    }

    async fn discover(&self, source: &JobSource) -> Result<Vec<RawListing>, CollectError> {
        let settings = self.settings(source);
        let categories: Vec<String> = settings.categories.clone().unwrap_or_else(|| {
            DEFAULT_CATEGORIES.iter().map(|c| c.to_string()).collect()
        });

        let mut all = Vec::new();
        let mut fetched = 0usize;
        let mut last_error: Option<FetchError> = None;

        for category in &categories {
            if self.deps.pacer.stopping() {
                tracing::info!("{NAME}: stop requested, skipping remaining categories");
                break;
            }

            let url = resolve_url(&source.base_url, category);
            match self
                .deps
                .fetch_paced(&url, &FetchOptions::default(), settings.category_delay)
                .await
            {
                Ok(body) => {
                    fetched += 1;
                    let listings = parse_category_page(&body, &source.base_url);
                    tracing::debug!("{NAME}: {} listings in {category}", listings.len());
                    all.extend(listings);
                }
                Err(e) => {
                    tracing::warn!("{NAME}: category {category} failed: {e}");
                    last_error = Some(e);
                }
            }
        }

        if fetched == 0
            && let Some(e) = last_error
        {
            return Err(e.into());
        }

        let unique = dedupe_by_id(all, |l| l.id.as_str());
        tracing::info!(
            "{NAME}: {} unique listings across {fetched} categories",
            unique.len()
        );
        Ok(unique.into_iter().map(RawListing::WeWorkRemotely).collect())
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
            let RawListing::WeWorkRemotely(mut listing) = raw else {
                return raw;
            };
            if !self.deps.pacer.stopping() {
                let details = self.fetch_details(&listing, delay).await;
                listing.description = details.description;
                listing.tags = details.tags;
            }
            RawListing::WeWorkRemotely(listing)
        })
        .await
    }
}
