use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::time::MissedTickBehavior;

use crate::collectors::{CollectError, JobCollector};
use crate::models::ingest_run::{RunReport, RunStatus};
use crate::models::job::NewJobPosting;
use crate::shutdown::StopSignal;
use crate::store::JobStore;

#[derive(Debug, Clone, Copy)]
pub struct ScheduleConfig {
    pub tick_interval: Duration,
    /// Pause between two collectors within one tick.
    pub adapter_delay: Duration,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            tick_interval: Duration::from_secs(30 * 60),
            adapter_delay: Duration::from_secs(5),
        }
    }
}

/// What one tick did, one report per collector that ran.
#[derive(Debug, Default)]
pub struct TickSummary {
    pub reports: Vec<RunReport>,
}

impl TickSummary {
    pub fn succeeded(&self) -> usize {
        self.reports
            .iter()
            .filter(|r| r.status == RunStatus::Succeeded)
            .count()
    }

    pub fn failed(&self) -> usize {
        self.reports.len() - self.succeeded()
    }

    pub fn postings_saved(&self) -> i64 {
        self.reports.iter().map(|r| r.postings_saved as i64).sum()
    }
}

pub struct Scheduler {
    store: Arc<dyn JobStore>,
    collectors: Vec<Box<dyn JobCollector>>,
    config: ScheduleConfig,
    stop: StopSignal,
}

impl Scheduler {
    pub fn new(
        store: Arc<dyn JobStore>,
        collectors: Vec<Box<dyn JobCollector>>,
        config: ScheduleConfig,
        stop: StopSignal,
    ) -> Self {
        Self {
            store,
            collectors,
            config,
            stop,
        }
    }

    /// Main loop: one tick immediately, then one per interval until stopped.
    /// A tick that overruns the interval delays the next one instead of
    /// overlapping it.
    pub async fn run(&self) {
        let mut ticker = tokio::time::interval(self.config.tick_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut stop = self.stop.clone();

        tracing::info!(
            "Scheduler started with {} collectors, ticking every {:?}",
            self.collectors.len(),
            self.config.tick_interval
        );

        loop {
            tokio::select! {
                biased;
                _ = stop.stopped() => {
                    tracing::info!("Shutdown signal received, exiting gracefully");
                    break;
                }
                _ = ticker.tick() => {}
            }

            let summary = self.run_tick().await;
            tracing::info!(
                "Tick finished: {} succeeded, {} failed, {} postings saved",
                summary.succeeded(),
                summary.failed(),
                summary.postings_saved()
            );
        }
    }

    /// Run every collector once, in order. A failing collector never stops
    /// the ones after it.
    pub async fn run_tick(&self) -> TickSummary {
        let mut summary = TickSummary::default();
        let mut stop = self.stop.clone();

        for (i, collector) in self.collectors.iter().enumerate() {
            if i > 0 && !self.config.adapter_delay.is_zero() {
                tokio::select! {
                    biased;
                    _ = stop.stopped() => {}
                    _ = tokio::time::sleep(self.config.adapter_delay) => {}
                }
            }
            if self.stop.is_stopped() {
                tracing::info!("Stop requested, skipping remaining collectors");
                break;
            }

            if let Some(report) = self.run_collector(collector.as_ref()).await {
                summary.reports.push(report);
            }
        }

        summary
    }

    /// Run one collector end to end and record the outcome. Returns `None`
    /// when its source is disabled.
    pub async fn run_collector(&self, collector: &dyn JobCollector) -> Option<RunReport> {
        let name = collector.name();
        let started_at = Utc::now();
        tracing::info!("Collecting from {name}");

        let report = match self.collect(collector).await {
            Ok((found, saved)) => {
                tracing::info!("{name} completed: {found} found, {saved} saved");
                RunReport::succeeded(name, started_at, found, saved)
            }
            Err(CollectError::Disabled(_)) => {
                tracing::info!("Source '{name}' is disabled, skipping");
                return None;
            }
            Err(e) => {
                let error = e.to_string();
                tracing::error!("{name} failed: {error}");
                RunReport::failed(name, started_at, &error)
            }
        };

        if let Err(e) = self.store.record_run(&report).await {
            tracing::warn!("Failed to record run for {name}: {e}");
        }
        Some(report)
    }

    async fn collect(&self, collector: &dyn JobCollector) -> Result<(usize, usize), CollectError> {
        let name = collector.name();
        let source = self.store.resolve_source(name).await?;
        if !source.enabled {
            return Err(CollectError::Disabled(name.to_string()));
        }

        let listings = collector.discover(&source).await?;
        let found = listings.len();

        let listings = collector.enrich(&source, listings).await;
        let postings: Vec<NewJobPosting> = listings
            .into_iter()
            .map(|raw| collector.normalize(raw).attach(source.id))
            .collect();

        let ids = self.store.upsert(&postings).await?;

        if let Err(e) = self.store.mark_fetched(source.id).await {
            tracing::warn!("Failed to mark {name} as fetched: {e}");
        }
        Ok((found, ids.len()))
    }
}
