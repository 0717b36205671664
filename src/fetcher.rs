//! Outbound document fetching for collectors.
//!
//! Every request carries a browser-like client identity drawn from a small
//! pool plus the usual accept headers. There are no retries here; callers
//! decide whether a failed fetch ends a category, a listing, or the run.

use std::time::Duration;

use async_trait::async_trait;
use rand::seq::IndexedRandom;
use reqwest::Client;
use reqwest::header::{
    ACCEPT, ACCEPT_LANGUAGE, HeaderMap, HeaderName, HeaderValue, UPGRADE_INSECURE_REQUESTS,
    USER_AGENT,
};

/// Browser user agents rotated across requests.
pub const DEFAULT_CLIENT_IDENTITIES: &[&str] = &[
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36",
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36",
];

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

const DEFAULT_ACCEPT: &str =
    "text/html,application/xhtml+xml,application/xml;q=0.9,image/webp,*/*;q=0.8";

/// Per-call overrides.
#[derive(Debug, Clone, Default)]
pub struct FetchOptions {
    pub headers: Vec<(String, String)>,
    pub timeout: Option<Duration>,
}

impl FetchOptions {
    pub fn json() -> Self {
        Self {
            headers: vec![("Accept".to_string(), "application/json".to_string())],
            timeout: None,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum FetchCause {
    #[error("request timed out")]
    Timeout,

    #[error("HTTP {0}")]
    Status(u16),

    #[error("{0}")]
    Transport(String),
}

#[derive(Debug, thiserror::Error)]
#[error("failed to fetch {url}: {cause}")]
pub struct FetchError {
    pub url: String,
    pub cause: FetchCause,
}

impl FetchError {
    pub fn new(url: &str, cause: FetchCause) -> Self {
        Self {
            url: url.to_string(),
            cause,
        }
    }

    fn from_reqwest(url: &str, err: reqwest::Error) -> Self {
        let cause = if err.is_timeout() {
            FetchCause::Timeout
        } else if let Some(status) = err.status() {
            FetchCause::Status(status.as_u16())
        } else {
            FetchCause::Transport(err.to_string())
        };
        Self::new(url, cause)
    }
}

/// Retrieves a document body as text.
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self, url: &str, options: &FetchOptions) -> Result<String, FetchError>;
}

/// Pool of client identities, one picked at random per request.
#[derive(Debug, Clone)]
pub struct IdentityPool {
    identities: Vec<String>,
}

impl IdentityPool {
    /// Builds a pool from the given identities, falling back to the
    /// built-in list when none are usable.
    pub fn new(identities: Vec<String>) -> Self {
        let identities: Vec<String> = identities
            .into_iter()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();
        if identities.is_empty() {
            return Self::default();
        }
        Self { identities }
    }

    pub fn pick(&self) -> &str {
        self.identities
            .choose(&mut rand::rng())
            .map(String::as_str)
            .unwrap_or(DEFAULT_CLIENT_IDENTITIES[0])
    }

    pub fn len(&self) -> usize {
        self.identities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.identities.is_empty()
    }
}

impl Default for IdentityPool {
    fn default() -> Self {
        Self {
            identities: DEFAULT_CLIENT_IDENTITIES
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

fn invalid_header(e: impl std::fmt::Display) -> FetchCause {
    FetchCause::Transport(format!("invalid header: {e}"))
}

/// Default request headers with `options.headers` replacing any default of
/// the same name.
fn request_headers(identity: &str, options: &FetchOptions) -> Result<HeaderMap, FetchCause> {
    let mut headers = HeaderMap::new();
    headers.insert(
        USER_AGENT,
        HeaderValue::from_str(identity).map_err(invalid_header)?,
    );
    headers.insert(ACCEPT, HeaderValue::from_static(DEFAULT_ACCEPT));
    headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.5"));
    headers.insert(UPGRADE_INSECURE_REQUESTS, HeaderValue::from_static("1"));

    for (name, value) in &options.headers {
        let name = HeaderName::from_bytes(name.as_bytes()).map_err(invalid_header)?;
        let value = HeaderValue::from_str(value).map_err(invalid_header)?;
        headers.insert(name, value);
    }
    Ok(headers)
}

/// reqwest-backed fetcher used in production.
pub struct HttpFetcher {
    client: Client,
    identities: IdentityPool,
}

impl HttpFetcher {
    pub fn new(identities: IdentityPool, timeout: Duration) -> Result<Self, FetchError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| FetchError::new("", FetchCause::Transport(e.to_string())))?;
        Ok(Self { client, identities })
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, url: &str, options: &FetchOptions) -> Result<String, FetchError> {
        let headers = request_headers(self.identities.pick(), options)
            .map_err(|cause| FetchError::new(url, cause))?;

        let mut request = self.client.get(url).headers(headers);
        if let Some(timeout) = options.timeout {
            request = request.timeout(timeout);
        }

        let resp = request
            .send()
            .await
            .map_err(|e| FetchError::from_reqwest(url, e))?;

        let status = resp.status();
        if !status.is_success() {
            tracing::warn!("{url} returned {status}");
            return Err(FetchError::new(url, FetchCause::Status(status.as_u16())));
        }

        resp.text()
            .await
            .map_err(|e| FetchError::from_reqwest(url, e))
    }
}
