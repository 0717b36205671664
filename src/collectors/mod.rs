// Collector module.
// Defines the trait, the raw listing union and the registry of job sources.

pub mod html;
pub mod remoteok;
pub mod remoteyeah;
pub mod runner;
pub mod settings;
pub mod weworkremotely;

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::stream::{self, StreamExt};

use crate::error::AppError;
use crate::fetcher::{FetchError, FetchOptions, Fetcher};
use crate::models::job::JobDraft;
use crate::models::source::JobSource;
use crate::throttle::Pacer;

pub use remoteok::{RemoteOk, RemoteOkListing};
pub use remoteyeah::{RemoteYeah, RemoteYeahListing};
pub use settings::{PacingOverrides, SourceDefaults, SourceSettings};
pub use weworkremotely::{WeWorkRemotely, WeWorkRemotelyListing};

#[derive(Debug, thiserror::Error)]
pub enum CollectError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Store(#[from] AppError),

    #[error("Source '{0}' is disabled")]
    Disabled(String),
}

/// A discovered listing before normalization, one variant per source.
#[derive(Debug, Clone, PartialEq)]
pub enum RawListing {
    RemoteOk(RemoteOkListing),
    WeWorkRemotely(WeWorkRemotelyListing),
    RemoteYeah(RemoteYeahListing),
}

impl RawListing {
    pub fn native_id(&self) -> &str {
        match self {
            RawListing::RemoteOk(l) => &l.id,
            RawListing::WeWorkRemotely(l) => &l.id,
            RawListing::RemoteYeah(l) => &l.id,
        }
    }

    /// Map onto the canonical shape with the owning source's rules.
    pub fn normalize(self) -> JobDraft {
        match self {
            RawListing::RemoteOk(l) => remoteok::normalize(l),
            RawListing::WeWorkRemotely(l) => weworkremotely::normalize(l),
            RawListing::RemoteYeah(l) => remoteyeah::normalize(l),
        }
    }
}

/// Trait that all job collectors must implement.
/// `discover` finds listings, `enrich` optionally adds per-listing details,
/// and `normalize` maps each listing onto the canonical posting shape.
#[async_trait]
pub trait JobCollector: Send + Sync {
    /// Name matching the `job_sources` row.
    fn name(&self) -> &str;

    async fn discover(&self, source: &JobSource) -> Result<Vec<RawListing>, CollectError>;

    async fn enrich(&self, _source: &JobSource, listings: Vec<RawListing>) -> Vec<RawListing> {
        listings
    }

    fn normalize(&self, raw: RawListing) -> JobDraft {
        raw.normalize()
    }
}

/// Shared utilities handed to every collector.
#[derive(Clone)]
pub struct CollectorDeps {
    pub fetcher: Arc<dyn Fetcher>,
    pub pacer: Pacer,
    pub overrides: PacingOverrides,
}

impl CollectorDeps {
    /// Fetch `url` while holding its host's permit. `delay` is the idle time
    /// owed to the host once this request has finished.
    pub async fn fetch_paced(
        &self,
        url: &str,
        options: &FetchOptions,
        delay: Duration,
    ) -> Result<String, FetchError> {
        let _permit = self.pacer.wait(url, delay).await;
        self.fetcher.fetch(url, options).await
    }
}

/// Names of the built-in collectors, in run order.
pub const COLLECTOR_NAMES: &[&str] = &[remoteok::NAME, weworkremotely::NAME, remoteyeah::NAME];

/// Look up a collector by its source name (case-insensitive).
pub fn get_collector(name: &str, deps: &CollectorDeps) -> Option<Box<dyn JobCollector>> {
    let collector: Box<dyn JobCollector> = match name.to_ascii_lowercase().as_str() {
        "remoteok" => Box::new(RemoteOk::new(deps.clone())),
        "weworkremotely" => Box::new(WeWorkRemotely::new(deps.clone())),
        "remoteyeah" => Box::new(RemoteYeah::new(deps.clone())),
        _ => return None,
    };
    Some(collector)
}

/// Build the collectors to run, in fixed order. `enabled` restricts the set
/// when given; unknown names are logged and ignored.
pub fn build_collectors(
    enabled: Option<&[String]>,
    deps: &CollectorDeps,
) -> Vec<Box<dyn JobCollector>> {
    if let Some(names) = enabled {
        for name in names {
            if !COLLECTOR_NAMES.iter().any(|n| n.eq_ignore_ascii_case(name)) {
                tracing::warn!("Unknown source '{name}' in enabled sources, ignoring");
            }
        }
    }

    COLLECTOR_NAMES
        .iter()
        .filter(|name| {
            enabled.is_none_or(|names| names.iter().any(|n| n.eq_ignore_ascii_case(name)))
        })
        .filter_map(|name| get_collector(name, deps))
        .collect()
}

/// Keep the first listing seen for each native id.
pub(crate) fn dedupe_by_id<T>(items: Vec<T>, id: impl Fn(&T) -> &str) -> Vec<T> {
    let mut seen = std::collections::HashSet::new();
    items
        .into_iter()
        .filter(|item| seen.insert(id(item).to_string()))
        .collect()
}

/// Run `enrich_one` over `items`, at most `concurrency` at a time, keeping
/// input order. Each call is responsible for its own pacing and failures.
pub(crate) async fn enrich_each<T, F, Fut>(items: Vec<T>, concurrency: usize, enrich_one: F) -> Vec<T>
where
    F: FnMut(T) -> Fut,
    Fut: Future<Output = T>,
{
    stream::iter(items)
        .map(enrich_one)
        .buffered(concurrency.max(1))
        .collect()
        .await
}
