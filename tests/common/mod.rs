// Common test utilities

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use jobfeed::collectors::{CollectorDeps, PacingOverrides};
use jobfeed::error::AppError;
use jobfeed::fetcher::{FetchCause, FetchError, FetchOptions, Fetcher};
use jobfeed::models::ingest_run::RunReport;
use jobfeed::models::job::NewJobPosting;
use jobfeed::models::source::JobSource;
use jobfeed::store::{JobStore, MemoryStore};
use jobfeed::throttle::Pacer;
use tokio::time::Instant;

/// Serves canned bodies by exact URL. Anything unknown answers 404.
#[derive(Default)]
pub struct StubFetcher {
    pages: HashMap<String, Result<String, u16>>,
    latency: Duration,
    calls: Mutex<Vec<String>>,
    spans: Mutex<Vec<(Instant, Instant)>>,
}

impl StubFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn page(mut self, url: &str, body: &str) -> Self {
        self.pages.insert(url.to_string(), Ok(body.to_string()));
        self
    }

    pub fn status(mut self, url: &str, status: u16) -> Self {
        self.pages.insert(url.to_string(), Err(status));
        self
    }

    /// Every response takes this long to arrive.
    pub fn latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    /// (start, end) of every request, ordered by start.
    pub fn spans(&self) -> Vec<(Instant, Instant)> {
        let mut spans = self.spans.lock().unwrap().clone();
        spans.sort();
        spans
    }
}

#[async_trait]
impl Fetcher for StubFetcher {
    async fn fetch(&self, url: &str, _options: &FetchOptions) -> Result<String, FetchError> {
        self.calls.lock().unwrap().push(url.to_string());
        let started = Instant::now();
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        self.spans.lock().unwrap().push((started, Instant::now()));

        match self.pages.get(url) {
            Some(Ok(body)) => Ok(body.clone()),
            Some(Err(status)) => Err(FetchError::new(url, FetchCause::Status(*status))),
            None => Err(FetchError::new(url, FetchCause::Status(404))),
        }
    }
}

/// Wraps a `MemoryStore` and fails writes for one source, the way an
/// unreachable database would.
pub struct FailingStore {
    pub inner: MemoryStore,
    pub upsert_fails_for: Option<i32>,
    pub mark_fails_for: Option<i32>,
}

impl FailingStore {
    pub fn new(inner: MemoryStore) -> Self {
        Self {
            inner,
            upsert_fails_for: None,
            mark_fails_for: None,
        }
    }
}

#[async_trait]
impl JobStore for FailingStore {
    async fn resolve_source(&self, name: &str) -> Result<JobSource, AppError> {
        self.inner.resolve_source(name).await
    }

    async fn upsert(&self, postings: &[NewJobPosting]) -> Result<Vec<i32>, AppError> {
        if let Some(id) = self.upsert_fails_for
            && postings.iter().any(|p| p.source_id == id)
        {
            return Err(AppError::Internal("connection refused".into()));
        }
        self.inner.upsert(postings).await
    }

    async fn mark_fetched(&self, source_id: i32) -> Result<(), AppError> {
        if self.mark_fails_for == Some(source_id) {
            return Err(AppError::Internal("connection reset".into()));
        }
        self.inner.mark_fetched(source_id).await
    }

    async fn record_run(&self, report: &RunReport) -> Result<(), AppError> {
        self.inner.record_run(report).await
    }
}

/// Collector dependencies with no detail pacing.
pub fn deps(fetcher: Arc<StubFetcher>) -> CollectorDeps {
    deps_with(
        fetcher,
        PacingOverrides {
            detail_delay: Some(Duration::ZERO),
            ..Default::default()
        },
    )
}

pub fn deps_with(fetcher: Arc<StubFetcher>, overrides: PacingOverrides) -> CollectorDeps {
    CollectorDeps {
        fetcher,
        pacer: Pacer::unstoppable(),
        overrides,
    }
}

pub const REMOTEOK_API: &str = "https://remoteok.io/api";
pub const WWR_BASE: &str = "https://weworkremotely.com";
pub const REMOTEYEAH_BASE: &str = "https://remoteyeah.com";

pub fn remoteok_body() -> String {
    serde_json::json!([
        { "legal": "API Terms of Service" },
        {
            "id": "1001",
            "position": "Senior Rust Engineer",
            "company": "Acme",
            "location": "Worldwide",
            "description": "Build ingestion pipelines",
            "tags": ["rust", "postgres"],
            "url": "https://remoteok.io/remote-jobs/1001",
            "salary_min": 120000,
            "salary_max": 160000,
            "date": "2025-05-01T10:00:00+00:00"
        },
        {
            "id": 1002,
            "position": "Part-time Support Agent",
            "company": "Globex",
            "description": "Help customers",
            "tags": [],
            "url": "https://remoteok.io/remote-jobs/1002",
            "salary": "$40,000 - $50,000",
            "epoch": 1714557600
        },
        {
            "id": "1003",
            "position": "Contract Designer",
            "company": "Initech"
        }
    ])
    .to_string()
}

pub const REMOTEYEAH_PAGE: &str = r#"
    <html><body>
      <div class="job-card" data-job-id="ry-1">
        <h3 class="job-title">Backend Developer</h3>
        <span class="company-name">Hooli</span>
        <span class="location">Hybrid - London</span>
        <span class="salary">$95,000</span>
        <span class="time-ago">2 days ago</span>
        <a href="/jobs/backend-developer">Apply</a>
        <div class="tags"><span class="tag">Go</span></div>
      </div>
      <div class="job-card" data-job-id="ry-2">
        <h3 class="job-title">Junior Frontend Engineer</h3>
        <span class="company-name">Pied Piper</span>
        <a href="/jobs/junior-frontend-engineer">Apply</a>
      </div>
    </body></html>
"#;

pub const REMOTEYEAH_DETAIL: &str = r#"
    <html><body>
      <div class="job-description">Own our Go services. Fully remote team.</div>
      <div class="skills"><span class="skill">Kubernetes</span><span class="skill">go</span></div>
    </body></html>
"#;
