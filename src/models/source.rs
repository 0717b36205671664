use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::PgPool;

use crate::error::AppError;

/// One external provider of job listings.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct JobSource {
    pub id: i32,
    pub name: String,
    pub base_url: String,
    pub api_endpoint: Option<String>,
    pub enabled: bool,
    /// Per-source tuning (category paths, detail cap, delays).
    pub config: serde_json::Value,
    pub last_fetched: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl JobSource {
    /// An in-memory source row, used before a store has assigned anything.
    pub fn new(id: i32, name: &str, base_url: &str, api_endpoint: Option<&str>) -> Self {
        let now = Utc::now();
        Self {
            id,
            name: name.to_string(),
            base_url: base_url.to_string(),
            api_endpoint: api_endpoint.map(String::from),
            enabled: true,
            config: serde_json::Value::Object(Default::default()),
            last_fetched: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// The sources seeded by the initial migration.
    pub fn defaults() -> Vec<JobSource> {
        vec![
            JobSource::new(
                1,
                "RemoteOK",
                "https://remoteok.io",
                Some("https://remoteok.io/api"),
            ),
            JobSource::new(2, "WeWorkRemotely", "https://weworkremotely.com", None),
            JobSource::new(3, "RemoteYeah", "https://remoteyeah.com", None),
        ]
    }

    pub async fn list(pool: &PgPool) -> Result<Vec<JobSource>, AppError> {
        let sources = sqlx::query_as::<_, JobSource>("SELECT * FROM job_sources ORDER BY id")
            .fetch_all(pool)
            .await?;
        Ok(sources)
    }

    pub async fn get_by_name(pool: &PgPool, name: &str) -> Result<JobSource, AppError> {
        sqlx::query_as::<_, JobSource>("SELECT * FROM job_sources WHERE name = $1")
            .bind(name)
            .fetch_optional(pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Source '{name}' not found")))
    }

    pub async fn mark_fetched(pool: &PgPool, id: i32) -> Result<(), AppError> {
        let result = sqlx::query(
            "UPDATE job_sources SET last_fetched = NOW(), updated_at = NOW() WHERE id = $1",
        )
        .bind(id)
        .execute(pool)
        .await?;
        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Source {id} not found")));
        }
        Ok(())
    }
}
