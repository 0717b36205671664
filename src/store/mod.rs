// Persistence seam for the ingestion pipeline.
// The scheduler only talks to `JobStore`; Postgres backs production and the
// in-memory store backs dry runs and tests.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;

use crate::error::AppError;
use crate::models::ingest_run::RunReport;
use crate::models::job::NewJobPosting;
use crate::models::source::JobSource;

pub use memory::MemoryStore;
pub use postgres::PgStore;

#[async_trait]
pub trait JobStore: Send + Sync {
    /// Look up the source row owning a collector's postings.
    async fn resolve_source(&self, name: &str) -> Result<JobSource, AppError>;

    /// Insert or merge each posting keyed by (source_id, source_job_id).
    /// Postings that fail are logged and skipped; the returned ids cover
    /// only the ones written. Fails as a whole only when the store is
    /// unreachable.
    async fn upsert(&self, postings: &[NewJobPosting]) -> Result<Vec<i32>, AppError>;

    async fn mark_fetched(&self, source_id: i32) -> Result<(), AppError>;

    async fn record_run(&self, report: &RunReport) -> Result<(), AppError>;
}
