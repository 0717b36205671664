use async_trait::async_trait;
use sqlx::PgPool;

use crate::error::AppError;
use crate::models::ingest_run::{IngestRun, RunReport};
use crate::models::job::{JobPosting, NewJobPosting};
use crate::models::source::JobSource;
use crate::store::JobStore;

#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl JobStore for PgStore {
    async fn resolve_source(&self, name: &str) -> Result<JobSource, AppError> {
        JobSource::get_by_name(&self.pool, name).await
    }

    async fn upsert(&self, postings: &[NewJobPosting]) -> Result<Vec<i32>, AppError> {
        if postings.is_empty() {
            return Ok(Vec::new());
        }

        let mut conn = self.pool.acquire().await?;
        let mut ids = Vec::with_capacity(postings.len());
        let mut inserted = 0;

        for posting in postings {
            match JobPosting::upsert(&mut *conn, posting).await {
                Ok((id, was_inserted)) => {
                    if was_inserted {
                        inserted += 1;
                    }
                    ids.push(id);
                }
                Err(e) => {
                    tracing::warn!(
                        "Failed to upsert posting '{}' ({}): {e}",
                        posting.draft.title,
                        posting.draft.source_job_id
                    );
                }
            }
        }

        tracing::debug!(
            "Upserted {} of {} postings ({inserted} new)",
            ids.len(),
            postings.len()
        );
        Ok(ids)
    }

    async fn mark_fetched(&self, source_id: i32) -> Result<(), AppError> {
        JobSource::mark_fetched(&self.pool, source_id).await
    }

    async fn record_run(&self, report: &RunReport) -> Result<(), AppError> {
        IngestRun::record(&self.pool, report).await.map(|_| ())
    }
}
