use axum::Json;
use axum::extract::State;
use sqlx::PgPool;

use crate::error::AppError;
use crate::models::source::JobSource;

pub async fn list(State(pool): State<PgPool>) -> Result<Json<Vec<JobSource>>, AppError> {
    let sources = JobSource::list(&pool).await?;
    Ok(Json(sources))
}
