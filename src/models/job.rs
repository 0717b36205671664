use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{PgConnection, PgPool};

use crate::error::AppError;

/// Employment arrangement of a posting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum JobType {
    #[default]
    FullTime,
    PartTime,
    Contract,
    Freelance,
    Internship,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RemoteType {
    #[default]
    Remote,
    Hybrid,
    OnSite,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ExperienceLevel {
    Entry,
    Junior,
    #[default]
    Mid,
    Senior,
    Lead,
}

macro_rules! text_enum {
    ($ty:ident { $($variant:ident => $text:literal),+ $(,)? }) => {
        impl $ty {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $($ty::$variant => $text),+
                }
            }
        }

        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $ty {
            type Err = AppError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($text => Ok($ty::$variant),)+
                    other => Err(AppError::BadRequest(format!(
                        "invalid {}: '{other}'",
                        stringify!($ty)
                    ))),
                }
            }
        }

        impl TryFrom<String> for $ty {
            type Error = AppError;

            fn try_from(value: String) -> Result<Self, Self::Error> {
                value.parse()
            }
        }
    };
}

text_enum!(JobType {
    FullTime => "full-time",
    PartTime => "part-time",
    Contract => "contract",
    Freelance => "freelance",
    Internship => "internship",
});

text_enum!(RemoteType {
    Remote => "remote",
    Hybrid => "hybrid",
    OnSite => "on-site",
});

text_enum!(ExperienceLevel {
    Entry => "entry",
    Junior => "junior",
    Mid => "mid",
    Senior => "senior",
    Lead => "lead",
});

/// Output of a source's normalize step. Carries every canonical field except
/// the owning source id, which the pipeline attaches afterwards.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JobDraft {
    pub title: String,
    pub company: String,
    pub location: String,
    pub description: String,
    pub tags: Vec<String>,
    pub source_job_id: String,
    pub apply_url: String,
    pub salary_min: Option<i32>,
    pub salary_max: Option<i32>,
    pub salary_currency: String,
    pub job_type: JobType,
    pub remote_type: RemoteType,
    pub experience_level: ExperienceLevel,
    pub posted_at: DateTime<Utc>,
}

impl JobDraft {
    pub fn attach(self, source_id: i32) -> NewJobPosting {
        NewJobPosting {
            source_id,
            draft: self,
        }
    }
}

/// A normalized posting ready for upsert.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewJobPosting {
    pub source_id: i32,
    #[serde(flatten)]
    pub draft: JobDraft,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct JobPosting {
    pub id: i32,
    pub title: String,
    pub company: String,
    pub location: String,
    pub description: String,
    pub tags: Vec<String>,
    pub source_id: i32,
    pub source_job_id: String,
    pub apply_url: String,
    pub salary_min: Option<i32>,
    pub salary_max: Option<i32>,
    pub salary_currency: String,
    #[sqlx(try_from = "String")]
    pub job_type: JobType,
    #[sqlx(try_from = "String")]
    pub remote_type: RemoteType,
    #[sqlx(try_from = "String")]
    pub experience_level: ExperienceLevel,
    pub posted_at: DateTime<Utc>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    #[default]
    Recent,
    Relevance,
}

/// Deepest page served; keeps the row offset well inside `i64`.
const MAX_PAGE: i64 = 1_000_000;

#[derive(Debug, Default, Deserialize)]
pub struct JobFilters {
    pub search: Option<String>,
    pub source: Option<String>,
    pub job_type: Option<JobType>,
    pub remote_type: Option<RemoteType>,
    pub experience_level: Option<ExperienceLevel>,
    /// Comma-separated; matches postings sharing at least one tag.
    pub tags: Option<String>,
    pub company: Option<String>,
    pub location: Option<String>,
    pub sort: Option<SortOrder>,
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

impl JobFilters {
    pub fn per_page(&self) -> i64 {
        self.per_page.unwrap_or(20).clamp(1, 100)
    }

    pub fn page(&self) -> i64 {
        self.page.unwrap_or(1).clamp(1, MAX_PAGE)
    }

    pub fn tag_list(&self) -> Option<Vec<String>> {
        let tags: Vec<String> = self
            .tags
            .as_deref()?
            .split(',')
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .collect();
        (!tags.is_empty()).then_some(tags)
    }
}

#[derive(Debug, Serialize)]
pub struct JobPage {
    pub jobs: Vec<JobPosting>,
    pub total: i64,
    pub page: i64,
    pub per_page: i64,
}

const SEARCH_CONDITIONS: &str = "j.is_active \
     AND ($1::text IS NULL OR j.title ILIKE '%' || $1 || '%' OR j.company ILIKE '%' || $1 || '%' OR j.description ILIKE '%' || $1 || '%') \
     AND ($2::text IS NULL OR s.name = $2) \
     AND ($3::text IS NULL OR j.job_type = $3) \
     AND ($4::text IS NULL OR j.remote_type = $4) \
     AND ($5::text IS NULL OR j.experience_level = $5) \
     AND ($6::text[] IS NULL OR j.tags && $6) \
     AND ($7::text IS NULL OR j.company ILIKE '%' || $7 || '%') \
     AND ($8::text IS NULL OR j.location ILIKE '%' || $8 || '%')";

impl JobPosting {
    /// Insert or merge-update one posting keyed by (source_id, source_job_id).
    /// Returns the row id and whether the row was newly inserted.
    pub async fn upsert(
        conn: &mut PgConnection,
        input: &NewJobPosting,
    ) -> Result<(i32, bool), AppError> {
        let d = &input.draft;
        let row: (i32, bool) = sqlx::query_as(
            "INSERT INTO job_postings (title, company, location, description, tags, source_id, source_job_id, apply_url, salary_min, salary_max, salary_currency, job_type, remote_type, experience_level, posted_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)
             ON CONFLICT (source_id, source_job_id) DO UPDATE SET
                 title = EXCLUDED.title,
                 company = EXCLUDED.company,
                 location = EXCLUDED.location,
                 description = EXCLUDED.description,
                 tags = EXCLUDED.tags,
                 apply_url = EXCLUDED.apply_url,
                 salary_min = EXCLUDED.salary_min,
                 salary_max = EXCLUDED.salary_max,
                 salary_currency = EXCLUDED.salary_currency,
                 job_type = EXCLUDED.job_type,
                 remote_type = EXCLUDED.remote_type,
                 experience_level = EXCLUDED.experience_level,
                 posted_at = EXCLUDED.posted_at,
                 updated_at = NOW()
             RETURNING id, (xmax = 0) AS inserted",
        )
        .bind(&d.title)
        .bind(&d.company)
        .bind(&d.location)
        .bind(&d.description)
        .bind(&d.tags)
        .bind(input.source_id)
        .bind(&d.source_job_id)
        .bind(&d.apply_url)
        .bind(d.salary_min)
        .bind(d.salary_max)
        .bind(&d.salary_currency)
        .bind(d.job_type.as_str())
        .bind(d.remote_type.as_str())
        .bind(d.experience_level.as_str())
        .bind(d.posted_at)
        .fetch_one(conn)
        .await?;
        Ok(row)
    }

    pub async fn search(pool: &PgPool, filters: &JobFilters) -> Result<JobPage, AppError> {
        let per_page = filters.per_page();
        let page = filters.page();
        let offset = (page - 1).saturating_mul(per_page);
        let search = filters.search.as_deref().filter(|s| !s.trim().is_empty());
        let tags = filters.tag_list();

        let order = match filters.sort.unwrap_or_default() {
            SortOrder::Relevance if search.is_some() => {
                "CASE WHEN j.title ILIKE '%' || $1 || '%' THEN 3 \
                      WHEN j.company ILIKE '%' || $1 || '%' THEN 2 \
                      WHEN j.description ILIKE '%' || $1 || '%' THEN 1 \
                      ELSE 0 END DESC, j.posted_at DESC"
            }
            _ => "j.posted_at DESC",
        };

        let list_sql = format!(
            "SELECT j.* FROM job_postings j JOIN job_sources s ON s.id = j.source_id WHERE {SEARCH_CONDITIONS} ORDER BY {order} LIMIT $9 OFFSET $10"
        );
        let jobs = sqlx::query_as::<_, JobPosting>(&list_sql)
            .bind(search)
            .bind(&filters.source)
            .bind(filters.job_type.map(|t| t.as_str()))
            .bind(filters.remote_type.map(|t| t.as_str()))
            .bind(filters.experience_level.map(|t| t.as_str()))
            .bind(&tags)
            .bind(&filters.company)
            .bind(&filters.location)
            .bind(per_page)
            .bind(offset)
            .fetch_all(pool)
            .await?;

        let count_sql = format!(
            "SELECT COUNT(*) FROM job_postings j JOIN job_sources s ON s.id = j.source_id WHERE {SEARCH_CONDITIONS}"
        );
        let (total,): (i64,) = sqlx::query_as(&count_sql)
            .bind(search)
            .bind(&filters.source)
            .bind(filters.job_type.map(|t| t.as_str()))
            .bind(filters.remote_type.map(|t| t.as_str()))
            .bind(filters.experience_level.map(|t| t.as_str()))
            .bind(&tags)
            .bind(&filters.company)
            .bind(&filters.location)
            .fetch_one(pool)
            .await?;

        Ok(JobPage {
            jobs,
            total,
            page,
            per_page,
        })
    }

    pub async fn get(pool: &PgPool, id: i32) -> Result<JobPosting, AppError> {
        sqlx::query_as::<_, JobPosting>("SELECT * FROM job_postings WHERE id = $1")
            .bind(id)
            .fetch_optional(pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Job {id} not found")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn enums_round_trip_through_text() {
        for t in [
            JobType::FullTime,
            JobType::PartTime,
            JobType::Contract,
            JobType::Freelance,
            JobType::Internship,
        ] {
            assert_eq!(t.as_str().parse::<JobType>().unwrap(), t);
        }
        assert_eq!("on-site".parse::<RemoteType>().unwrap(), RemoteType::OnSite);
        assert!("principal".parse::<ExperienceLevel>().is_err());
    }

    #[test]
    fn enums_serialize_kebab_case() {
        assert_eq!(
            serde_json::to_string(&JobType::PartTime).unwrap(),
            "\"part-time\""
        );
        assert_eq!(
            serde_json::to_string(&RemoteType::OnSite).unwrap(),
            "\"on-site\""
        );
    }

    #[test]
    fn filters_clamp_paging_and_split_tags() {
        let filters = JobFilters {
            tags: Some("rust, go,,".into()),
            per_page: Some(500),
            page: Some(0),
            ..Default::default()
        };
        assert_eq!(filters.per_page(), 100);
        assert_eq!(filters.page(), 1);
        assert_eq!(
            filters.tag_list(),
            Some(vec!["rust".to_string(), "go".to_string()])
        );

        let empty = JobFilters {
            tags: Some(" , ".into()),
            ..Default::default()
        };
        assert_eq!(empty.tag_list(), None);
    }

    #[test]
    fn huge_page_is_capped() {
        let filters = JobFilters {
            page: Some(i64::MAX),
            per_page: Some(100),
            ..Default::default()
        };
        assert_eq!(filters.page(), MAX_PAGE);
        let offset = (filters.page() - 1).saturating_mul(filters.per_page());
        assert_eq!(offset, (MAX_PAGE - 1) * 100);
    }
}
