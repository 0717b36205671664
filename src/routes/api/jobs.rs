use axum::Json;
use axum::extract::{Path, Query, State};
use sqlx::PgPool;

use crate::error::AppError;
use crate::models::job::{JobFilters, JobPage, JobPosting};

pub async fn list(
    State(pool): State<PgPool>,
    Query(filters): Query<JobFilters>,
) -> Result<Json<JobPage>, AppError> {
    let page = JobPosting::search(&pool, &filters).await?;
    Ok(Json(page))
}

pub async fn get(
    State(pool): State<PgPool>,
    Path(id): Path<i32>,
) -> Result<Json<JobPosting>, AppError> {
    let job = JobPosting::get(&pool, id).await?;
    Ok(Json(job))
}
