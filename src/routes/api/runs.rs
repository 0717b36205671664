use axum::Json;
use axum::extract::{Query, State};
use serde::Deserialize;
use sqlx::PgPool;

use crate::error::AppError;
use crate::models::ingest_run::IngestRun;

#[derive(Debug, Deserialize)]
pub struct RunsQuery {
    pub source: Option<String>,
    pub limit: Option<i64>,
}

pub async fn list(
    State(pool): State<PgPool>,
    Query(query): Query<RunsQuery>,
) -> Result<Json<Vec<IngestRun>>, AppError> {
    let limit = query.limit.unwrap_or(20).clamp(1, 100);
    let runs = IngestRun::recent(&pool, query.source.as_deref(), limit).await?;
    Ok(Json(runs))
}
