use std::time::Duration;

use serde::Deserialize;

use crate::models::source::JobSource;

/// Operator-level overrides from the CLI/environment. They beat both the
/// source row's config and the collector's defaults.
#[derive(Debug, Clone)]
pub struct PacingOverrides {
    pub detail_delay: Option<Duration>,
    pub detail_fetch_cap: Option<usize>,
    pub detail_concurrency: usize,
}

impl Default for PacingOverrides {
    fn default() -> Self {
        Self {
            detail_delay: None,
            detail_fetch_cap: None,
            detail_concurrency: 1,
        }
    }
}

/// Collector-specific fallbacks.
#[derive(Debug, Clone, Copy)]
pub struct SourceDefaults {
    pub category_delay: Duration,
    pub detail_delay: Duration,
    pub detail_fetch_cap: usize,
}

/// Shape of `job_sources.config`.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct SourceConfig {
    categories: Option<Vec<String>>,
    category_delay_ms: Option<u64>,
    detail_delay_ms: Option<u64>,
    detail_fetch_cap: Option<usize>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SourceSettings {
    pub categories: Option<Vec<String>>,
    pub category_delay: Duration,
    pub detail_delay: Duration,
    pub detail_fetch_cap: usize,
    pub detail_concurrency: usize,
}

impl SourceSettings {
    pub fn resolve(
        source: &JobSource,
        overrides: &PacingOverrides,
        defaults: SourceDefaults,
    ) -> Self {
        let config: SourceConfig = if source.config.is_null() {
            SourceConfig::default()
        } else {
            serde_json::from_value(source.config.clone()).unwrap_or_else(|e| {
                tracing::warn!("Ignoring malformed config for source '{}': {e}", source.name);
                SourceConfig::default()
            })
        };

        Self {
            categories: config.categories.filter(|c| !c.is_empty()),
            category_delay: config
                .category_delay_ms
                .map(Duration::from_millis)
                .unwrap_or(defaults.category_delay),
            detail_delay: overrides
                .detail_delay
                .or(config.detail_delay_ms.map(Duration::from_millis))
                .unwrap_or(defaults.detail_delay),
            detail_fetch_cap: overrides
                .detail_fetch_cap
                .or(config.detail_fetch_cap)
                .unwrap_or(defaults.detail_fetch_cap),
            detail_concurrency: overrides.detail_concurrency.clamp(1, 4),
        }
    }
}
