//! Scheduler isolation and cooperative stop.

mod common;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use jobfeed::collectors::runner::{ScheduleConfig, Scheduler};
use jobfeed::collectors::{CollectError, JobCollector, RawListing, RemoteOk, RemoteYeah, WeWorkRemotely};
use jobfeed::models::ingest_run::RunStatus;
use jobfeed::models::source::JobSource;
use jobfeed::shutdown::{self, StopHandle, StopSignal};
use jobfeed::store::MemoryStore;

use common::*;

fn config() -> ScheduleConfig {
    ScheduleConfig {
        tick_interval: Duration::from_secs(60),
        adapter_delay: Duration::from_secs(5),
    }
}

#[tokio::test(start_paused = true)]
async fn failing_collector_does_not_stop_the_others() {
    // Every WeWorkRemotely category answers 404, so its discovery fails.
    let fetcher = Arc::new(
        StubFetcher::new()
            .page(REMOTEOK_API, &remoteok_body())
            .page(REMOTEYEAH_BASE, REMOTEYEAH_PAGE),
    );
    let store = Arc::new(MemoryStore::with_default_sources());
    let scheduler = Scheduler::new(
        store.clone(),
        vec![
            Box::new(RemoteOk::new(deps(fetcher.clone()))),
            Box::new(WeWorkRemotely::new(deps(fetcher.clone()))),
            Box::new(RemoteYeah::new(deps(fetcher))),
        ],
        config(),
        StopSignal::never(),
    );

    let summary = scheduler.run_tick().await;

    let statuses: Vec<_> = summary.reports.iter().map(|r| r.status).collect();
    assert_eq!(
        statuses,
        vec![RunStatus::Succeeded, RunStatus::Failed, RunStatus::Succeeded]
    );
    assert!(summary.reports[1].error.is_some());

    assert!(store.source("RemoteOK").await.unwrap().last_fetched.is_some());
    assert!(store.source("WeWorkRemotely").await.unwrap().last_fetched.is_none());
    assert!(store.source("RemoteYeah").await.unwrap().last_fetched.is_some());
    assert_eq!(store.runs().await.len(), 3);
}

#[tokio::test(start_paused = true)]
async fn unreachable_store_fails_only_that_run() {
    let fetcher = Arc::new(
        StubFetcher::new()
            .page(REMOTEOK_API, &remoteok_body())
            .page(REMOTEYEAH_BASE, REMOTEYEAH_PAGE),
    );
    let mut store = FailingStore::new(MemoryStore::with_default_sources());
    let remoteok = store.inner.source("RemoteOK").await.unwrap();
    store.upsert_fails_for = Some(remoteok.id);
    let store = Arc::new(store);

    let scheduler = Scheduler::new(
        store.clone(),
        vec![
            Box::new(RemoteOk::new(deps(fetcher.clone()))),
            Box::new(RemoteYeah::new(deps(fetcher))),
        ],
        config(),
        StopSignal::never(),
    );

    let summary = scheduler.run_tick().await;

    let statuses: Vec<_> = summary.reports.iter().map(|r| r.status).collect();
    assert_eq!(statuses, vec![RunStatus::Failed, RunStatus::Succeeded]);
    assert!(
        summary.reports[0]
            .error
            .as_deref()
            .is_some_and(|e| e.contains("connection refused"))
    );
    assert_eq!(summary.reports[0].postings_saved, 0);
    assert_eq!(summary.reports[1].postings_saved, 2);

    assert!(store.inner.source("RemoteOK").await.unwrap().last_fetched.is_none());
    assert!(store.inner.source("RemoteYeah").await.unwrap().last_fetched.is_some());
    assert_eq!(store.inner.runs().await.len(), 2);
    assert!(store.inner.postings().await.iter().all(|p| p.source_id != remoteok.id));
}

#[tokio::test]
async fn mark_fetched_failure_still_succeeds() {
    let fetcher = Arc::new(StubFetcher::new().page(REMOTEOK_API, &remoteok_body()));
    let mut store = FailingStore::new(MemoryStore::with_default_sources());
    let remoteok = store.inner.source("RemoteOK").await.unwrap();
    store.mark_fails_for = Some(remoteok.id);
    let store = Arc::new(store);

    let scheduler = Scheduler::new(
        store.clone(),
        vec![Box::new(RemoteOk::new(deps(fetcher)))],
        config(),
        StopSignal::never(),
    );

    let summary = scheduler.run_tick().await;

    assert_eq!(summary.reports[0].status, RunStatus::Succeeded);
    assert_eq!(summary.postings_saved(), 3);
    assert!(store.inner.source("RemoteOK").await.unwrap().last_fetched.is_none());
    assert_eq!(store.inner.runs().await[0].status, RunStatus::Succeeded);
}

/// Discovers one listing and requests a stop while doing so.
struct StopsMidRun {
    name: &'static str,
    handle: StopHandle,
}

#[async_trait]
impl JobCollector for StopsMidRun {
    fn name(&self) -> &str {
        self.name
    }

    async fn discover(&self, _source: &JobSource) -> Result<Vec<RawListing>, CollectError> {
        self.handle.stop();
        Ok(vec![RawListing::RemoteOk(jobfeed::collectors::RemoteOkListing {
            id: "in-flight".into(),
            position: "Engineer".into(),
            company: "Acme".into(),
            ..Default::default()
        })])
    }
}

#[tokio::test(start_paused = true)]
async fn stop_finishes_the_current_collector_and_skips_the_rest() {
    let (handle, signal) = shutdown::channel();
    let fetcher = Arc::new(StubFetcher::new().page(REMOTEYEAH_BASE, REMOTEYEAH_PAGE));
    let store = Arc::new(MemoryStore::with_default_sources());

    let scheduler = Scheduler::new(
        store.clone(),
        vec![
            Box::new(StopsMidRun { name: "RemoteOK", handle }),
            Box::new(RemoteYeah::new(deps(fetcher.clone()))),
        ],
        config(),
        signal,
    );

    let summary = scheduler.run_tick().await;

    assert_eq!(summary.reports.len(), 1);
    assert_eq!(summary.postings_saved(), 1);
    assert!(fetcher.calls().is_empty());
    assert!(store.source("RemoteOK").await.unwrap().last_fetched.is_some());
}
