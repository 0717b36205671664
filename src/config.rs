use std::time::Duration;

use clap::Parser;

use crate::collectors::PacingOverrides;
use crate::collectors::runner::ScheduleConfig;

#[derive(Parser, Debug, Clone)]
#[command(name = "jobfeed", about = "Remote job posting ingestion service")]
pub struct Config {
    /// Database connection URL (not needed for `once --dry-run`)
    #[arg(long, env = "DATABASE_URL")]
    pub database_url: Option<String>,

    /// Run database migrations on startup
    #[arg(long, env = "RUN_MIGRATIONS", default_value = "true")]
    pub run_migrations: bool,

    /// Log output format
    #[arg(long, env = "LOG_FORMAT", value_enum, default_value = "text")]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(clap::ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Text,
    Json,
}

#[derive(clap::Subcommand, Debug, Clone)]
pub enum Command {
    /// Serve the read API (default when no subcommand given)
    Serve {
        /// Listen address
        #[arg(long, env = "LISTEN_ADDR", default_value = "0.0.0.0:8080")]
        listen_addr: String,
    },
    /// Run every collector now and then on a fixed interval
    Schedule {
        #[command(flatten)]
        scrape: ScrapeArgs,
    },
    /// Run every collector once and exit
    Once {
        #[command(flatten)]
        scrape: ScrapeArgs,

        /// Keep results in memory instead of the database
        #[arg(long)]
        dry_run: bool,
    },
}

#[derive(clap::Args, Debug, Clone)]
pub struct ScrapeArgs {
    /// Seconds between ticks
    #[arg(long, env = "TICK_INTERVAL_SECS", default_value = "1800")]
    pub tick_interval_secs: u64,

    /// Pause between collectors within a tick, in milliseconds
    #[arg(long, env = "PER_ADAPTER_DELAY_MS", default_value = "5000")]
    pub per_adapter_delay_ms: u64,

    /// Pause between detail-page requests, in milliseconds (overrides every source)
    #[arg(long, env = "PER_DETAIL_DELAY_MS")]
    pub per_detail_delay_ms: Option<u64>,

    /// Maximum listings per source that get a detail fetch
    #[arg(long, env = "DETAIL_FETCH_CAP")]
    pub detail_fetch_cap: Option<usize>,

    /// Detail fetches in flight per source
    #[arg(
        long,
        env = "DETAIL_CONCURRENCY",
        default_value = "1",
        value_parser = clap::value_parser!(u8).range(1..=4)
    )]
    pub detail_concurrency: u8,

    /// Per-request timeout in seconds
    #[arg(long, env = "REQUEST_TIMEOUT_SECS", default_value = "30")]
    pub request_timeout_secs: u64,

    /// User-Agent strings to rotate through, separated by `|`
    #[arg(long, env = "CLIENT_IDENTITY_POOL", value_delimiter = '|')]
    pub client_identity_pool: Vec<String>,

    /// Sources to run, comma-separated (all when unset)
    #[arg(long, env = "ENABLED_SOURCES", value_delimiter = ',')]
    pub enabled_sources: Vec<String>,
}

impl Config {
    /// Resolve the command, defaulting to Serve if none specified.
    pub fn resolved_command(&self) -> Command {
        self.command.clone().unwrap_or(Command::Serve {
            listen_addr: std::env::var("LISTEN_ADDR")
                .unwrap_or_else(|_| "0.0.0.0:8080".to_string()),
        })
    }
}

impl ScrapeArgs {
    pub fn schedule(&self) -> ScheduleConfig {
        ScheduleConfig {
            tick_interval: Duration::from_secs(self.tick_interval_secs.max(1)),
            adapter_delay: Duration::from_millis(self.per_adapter_delay_ms),
        }
    }

    pub fn overrides(&self) -> PacingOverrides {
        PacingOverrides {
            detail_delay: self.per_detail_delay_ms.map(Duration::from_millis),
            detail_fetch_cap: self.detail_fetch_cap,
            detail_concurrency: self.detail_concurrency as usize,
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.max(1))
    }

    pub fn identities(&self) -> Vec<String> {
        self.client_identity_pool
            .iter()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect()
    }

    /// `None` means every built-in source.
    pub fn enabled(&self) -> Option<Vec<String>> {
        let names: Vec<String> = self
            .enabled_sources
            .iter()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();
        (!names.is_empty()).then_some(names)
    }
}
