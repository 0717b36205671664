//! Per-host courtesy pacing.
//!
//! A request holds its host's permit for as long as it is in flight. Dropping
//! the permit books the next slot `interval` after the response finished, so
//! the courtesy delay is idle time between requests and a host never sees
//! more than one request at a time, however many detail fetches are queued.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Mutex, OwnedMutexGuard};
use tokio::time::Instant;
use tracing::debug;
use url::Url;

use crate::shutdown::StopSignal;

/// Earliest instant the host may be contacted again.
type HostGate = Arc<Mutex<Option<Instant>>>;

#[derive(Debug, Clone, Default)]
pub struct RateLimiter {
    hosts: Arc<Mutex<HashMap<String, HostGate>>>,
}

/// Exclusive use of one host. Release it once the response body is read.
#[must_use = "the next slot is booked when the permit is dropped"]
#[derive(Debug)]
pub struct HostPermit {
    gate: OwnedMutexGuard<Option<Instant>>,
    interval: Duration,
}

impl Drop for HostPermit {
    fn drop(&mut self) {
        *self.gate = Some(Instant::now() + self.interval);
    }
}

impl RateLimiter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Extract the host used as the pacing key.
    pub fn host_key(url: &str) -> String {
        Url::parse(url)
            .ok()
            .and_then(|u| u.host_str().map(|h| h.to_ascii_lowercase()))
            .unwrap_or_default()
    }

    /// Waits until no other request to `url`'s host is in flight and the
    /// previous one finished at least its interval ago. `interval` is the
    /// idle time owed after this request completes.
    pub async fn acquire(&self, url: &str, interval: Duration) -> HostPermit {
        let host = Self::host_key(url);
        let gate = self.hosts.lock().await.entry(host.clone()).or_default().clone();

        let gate = gate.lock_owned().await;
        if let Some(free_at) = *gate
            && free_at > Instant::now()
        {
            debug!("Pacing {host}: waiting {:?}", free_at - Instant::now());
            tokio::time::sleep_until(free_at).await;
        }

        HostPermit { gate, interval }
    }
}

/// The pacing policy shared by every collector: a rate limiter plus the stop
/// signal checked between requests.
#[derive(Debug, Clone)]
pub struct Pacer {
    limiter: RateLimiter,
    stop: StopSignal,
}

impl Pacer {
    pub fn new(limiter: RateLimiter, stop: StopSignal) -> Self {
        Self { limiter, stop }
    }

    /// A pacer that is never stopped.
    pub fn unstoppable() -> Self {
        Self::new(RateLimiter::new(), StopSignal::never())
    }

    pub async fn wait(&self, url: &str, interval: Duration) -> HostPermit {
        self.limiter.acquire(url, interval).await
    }

    /// True once a stop was requested; collectors stop issuing new requests.
    pub fn stopping(&self) -> bool {
        self.stop.is_stopped()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn host_key_ignores_path_and_case() {
        assert_eq!(
            RateLimiter::host_key("https://WeWorkRemotely.com/remote-jobs/all"),
            "weworkremotely.com"
        );
        assert_eq!(RateLimiter::host_key("not a url"), "");
    }

    #[tokio::test(start_paused = true)]
    async fn delay_counts_from_release() {
        let limiter = RateLimiter::new();
        let interval = Duration::from_secs(2);
        let begin = Instant::now();

        let permit = limiter.acquire("https://a.example/1", interval).await;
        assert_eq!(Instant::now() - begin, Duration::ZERO);
        // A slow response outlasting the interval.
        tokio::time::sleep(Duration::from_secs(3)).await;
        drop(permit);

        let _permit = limiter.acquire("https://a.example/2", interval).await;
        assert_eq!(Instant::now() - begin, Duration::from_secs(5));
    }

    #[tokio::test(start_paused = true)]
    async fn hosts_are_paced_independently() {
        let limiter = RateLimiter::new();
        let interval = Duration::from_secs(5);
        let begin = Instant::now();

        let _a = limiter.acquire("https://a.example/", interval).await;
        let _b = limiter.acquire("https://b.example/", interval).await;

        assert_eq!(Instant::now() - begin, Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn concurrent_callers_never_overlap() {
        let limiter = RateLimiter::new();
        let interval = Duration::from_secs(1);
        let begin = Instant::now();

        let handles: Vec<_> = (0..4)
            .map(|i| {
                let limiter = limiter.clone();
                tokio::spawn(async move {
                    let permit = limiter
                        .acquire(&format!("https://a.example/{i}"), interval)
                        .await;
                    let started = Instant::now() - begin;
                    tokio::time::sleep(Duration::from_secs(3)).await;
                    let finished = Instant::now() - begin;
                    drop(permit);
                    (started, finished)
                })
            })
            .collect();

        let mut spans = Vec::new();
        for handle in handles {
            spans.push(handle.await.unwrap());
        }
        spans.sort();
        for pair in spans.windows(2) {
            let (_, prev_end) = pair[0];
            let (next_start, _) = pair[1];
            assert!(next_start >= prev_end + interval);
        }
    }
}
