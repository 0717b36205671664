use std::sync::Arc;

use anyhow::Context;
use axum::Router;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use clap::Parser;
use sqlx::PgPool;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use jobfeed::collectors::runner::Scheduler;
use jobfeed::collectors::{self, CollectorDeps};
use jobfeed::config::{Command, Config, LogFormat, ScrapeArgs};
use jobfeed::fetcher::{HttpFetcher, IdentityPool};
use jobfeed::shutdown::{self, StopHandle, StopSignal};
use jobfeed::store::{JobStore, MemoryStore, PgStore};
use jobfeed::throttle::{Pacer, RateLimiter};
use jobfeed::{db, routes};

async fn healthz() -> impl IntoResponse {
    (StatusCode::OK, "ok")
}

async fn readyz(pool: PgPool) -> impl IntoResponse {
    let result: Result<(i32,), _> = sqlx::query_as("SELECT 1").fetch_one(&pool).await;
    match result {
        Ok(_) => (StatusCode::OK, "ready"),
        Err(_) => (StatusCode::SERVICE_UNAVAILABLE, "not ready"),
    }
}

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("jobfeed=info,tower_http=info"));
    let subscriber = tracing_subscriber::fmt().with_env_filter(filter);
    match format {
        LogFormat::Json => subscriber.json().init(),
        LogFormat::Text => subscriber.init(),
    }
}

async fn connect(config: &Config) -> anyhow::Result<PgPool> {
    let url = config
        .database_url
        .as_deref()
        .context("DATABASE_URL is required")?;

    tracing::info!("Connecting to database...");
    let pool = db::create_pool(url)
        .await
        .context("Failed to connect to database")?;

    if config.run_migrations {
        tracing::info!("Running database migrations...");
        db::run_migrations(&pool)
            .await
            .context("Failed to run migrations")?;
        tracing::info!("Migrations complete");
    }

    Ok(pool)
}

/// Trip the stop handle on SIGINT or SIGTERM.
fn listen_for_shutdown(handle: StopHandle) {
    tokio::spawn(async move {
        let ctrl_c = async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::warn!("Cannot listen for ctrl-c: {e}");
                std::future::pending::<()>().await;
            }
        };

        #[cfg(unix)]
        let terminate = async {
            use tokio::signal::unix::{SignalKind, signal};
            match signal(SignalKind::terminate()) {
                Ok(mut stream) => {
                    stream.recv().await;
                }
                Err(e) => {
                    tracing::warn!("Cannot listen for SIGTERM: {e}");
                    std::future::pending::<()>().await;
                }
            }
        };
        #[cfg(not(unix))]
        let terminate = std::future::pending::<()>();

        tokio::select! {
            _ = ctrl_c => {}
            _ = terminate => {}
        }
        tracing::info!("Shutdown signal received, finishing in-flight work");
        handle.stop();
    });
}

fn build_scheduler(
    store: Arc<dyn JobStore>,
    scrape: &ScrapeArgs,
    stop: StopSignal,
) -> anyhow::Result<Scheduler> {
    let identities = IdentityPool::new(scrape.identities());
    tracing::info!("Rotating {} client identities", identities.len());
    let fetcher = HttpFetcher::new(identities, scrape.request_timeout())
        .context("Failed to build HTTP client")?;

    let deps = CollectorDeps {
        fetcher: Arc::new(fetcher),
        pacer: Pacer::new(RateLimiter::new(), stop.clone()),
        overrides: scrape.overrides(),
    };

    let enabled = scrape.enabled();
    let collectors = collectors::build_collectors(enabled.as_deref(), &deps);
    if collectors.is_empty() {
        anyhow::bail!("No collectors enabled");
    }

    Ok(Scheduler::new(store, collectors, scrape.schedule(), stop))
}

async fn serve(pool: PgPool, listen_addr: &str, mut stop: StopSignal) -> anyhow::Result<()> {
    let readyz_pool = pool.clone();
    let app = Router::new()
        .route("/healthz", get(healthz))
        .route("/readyz", get(move || readyz(readyz_pool.clone())))
        .merge(routes::api::router(pool))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let listener = tokio::net::TcpListener::bind(listen_addr).await?;
    tracing::info!("Listening on {listen_addr}");
    axum::serve(listener, app)
        .with_graceful_shutdown(async move { stop.stopped().await })
        .await?;

    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::parse();
    init_tracing(config.log_format);

    let (handle, stop) = shutdown::channel();
    listen_for_shutdown(handle);

    match config.resolved_command() {
        Command::Serve { listen_addr } => {
            let pool = connect(&config).await?;
            serve(pool, &listen_addr, stop).await?;
        }
        Command::Schedule { scrape } => {
            let store = Arc::new(PgStore::new(connect(&config).await?));
            let scheduler = build_scheduler(store, &scrape, stop)?;
            scheduler.run().await;
        }
        Command::Once { scrape, dry_run } => {
            let memory = dry_run.then(|| Arc::new(MemoryStore::with_default_sources()));
            let store: Arc<dyn JobStore> = match &memory {
                Some(memory) => memory.clone(),
                None => Arc::new(PgStore::new(connect(&config).await?)),
            };

            let summary = build_scheduler(store, &scrape, stop)?.run_tick().await;
            tracing::info!(
                "Run finished: {} succeeded, {} failed, {} postings saved",
                summary.succeeded(),
                summary.failed(),
                summary.postings_saved()
            );

            if let Some(memory) = memory {
                let postings = memory.postings().await;
                println!("{}", serde_json::to_string_pretty(&postings)?);
            }
        }
    }

    Ok(())
}
