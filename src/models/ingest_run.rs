use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::PgPool;

use crate::error::AppError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    Succeeded,
    Failed,
}

impl RunStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunStatus::Succeeded => "succeeded",
            RunStatus::Failed => "failed",
        }
    }
}

/// Outcome of one collector run, produced by the scheduler.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub source_name: String,
    pub status: RunStatus,
    pub listings_found: i32,
    pub postings_saved: i32,
    pub error: Option<String>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl RunReport {
    pub fn succeeded(
        source_name: &str,
        started_at: DateTime<Utc>,
        listings_found: usize,
        postings_saved: usize,
    ) -> Self {
        Self {
            source_name: source_name.to_string(),
            status: RunStatus::Succeeded,
            listings_found: listings_found as i32,
            postings_saved: postings_saved as i32,
            error: None,
            started_at,
            finished_at: Utc::now(),
        }
    }

    pub fn failed(source_name: &str, started_at: DateTime<Utc>, error: &str) -> Self {
        Self {
            source_name: source_name.to_string(),
            status: RunStatus::Failed,
            listings_found: 0,
            postings_saved: 0,
            error: Some(error.to_string()),
            started_at,
            finished_at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct IngestRun {
    pub id: i32,
    pub source_name: String,
    pub status: String,
    pub listings_found: i32,
    pub postings_saved: i32,
    pub error: Option<String>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl IngestRun {
    pub async fn record(pool: &PgPool, report: &RunReport) -> Result<IngestRun, AppError> {
        let run = sqlx::query_as::<_, IngestRun>(
            "INSERT INTO ingest_runs (source_name, status, listings_found, postings_saved, error, started_at, finished_at) VALUES ($1, $2, $3, $4, $5, $6, $7) RETURNING *",
        )
        .bind(&report.source_name)
        .bind(report.status.as_str())
        .bind(report.listings_found)
        .bind(report.postings_saved)
        .bind(&report.error)
        .bind(report.started_at)
        .bind(report.finished_at)
        .fetch_one(pool)
        .await?;
        Ok(run)
    }

    /// Get recent runs, optionally filtered by source name.
    pub async fn recent(
        pool: &PgPool,
        source_name: Option<&str>,
        limit: i64,
    ) -> Result<Vec<IngestRun>, AppError> {
        let runs = sqlx::query_as::<_, IngestRun>(
            "SELECT * FROM ingest_runs WHERE ($1::text IS NULL OR source_name = $1) ORDER BY started_at DESC LIMIT $2",
        )
        .bind(source_name)
        .bind(limit)
        .fetch_all(pool)
        .await?;
        Ok(runs)
    }
}
