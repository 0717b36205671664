use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::Mutex;

use crate::error::AppError;
use crate::models::ingest_run::RunReport;
use crate::models::job::{JobPosting, NewJobPosting};
use crate::models::source::JobSource;
use crate::store::JobStore;

#[derive(Debug, Default)]
struct State {
    sources: Vec<JobSource>,
    postings: Vec<JobPosting>,
    runs: Vec<RunReport>,
    next_id: i32,
}

/// Process-local store with the same keys and constraints as the database
/// schema. Nothing survives the process.
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: Mutex<State>,
}

impl MemoryStore {
    pub fn with_sources(sources: Vec<JobSource>) -> Self {
        Self {
            state: Mutex::new(State {
                sources,
                ..Default::default()
            }),
        }
    }

    /// Seeded like a freshly migrated database.
    pub fn with_default_sources() -> Self {
        Self::with_sources(JobSource::defaults())
    }

    pub async fn postings(&self) -> Vec<JobPosting> {
        self.state.lock().await.postings.clone()
    }

    pub async fn runs(&self) -> Vec<RunReport> {
        self.state.lock().await.runs.clone()
    }

    pub async fn source(&self, name: &str) -> Option<JobSource> {
        let state = self.state.lock().await;
        state.sources.iter().find(|s| s.name == name).cloned()
    }
}

impl State {
    fn check(&self, posting: &NewJobPosting) -> Result<(), AppError> {
        let draft = &posting.draft;
        if draft.title.is_empty() {
            return Err(AppError::Constraint("title must not be empty".into()));
        }
        if draft.source_job_id.is_empty() {
            return Err(AppError::Constraint("source_job_id must not be empty".into()));
        }
        if !self.sources.iter().any(|s| s.id == posting.source_id) {
            return Err(AppError::Constraint(format!(
                "source {} does not exist",
                posting.source_id
            )));
        }
        Ok(())
    }

    fn upsert_one(&mut self, posting: &NewJobPosting) -> Result<i32, AppError> {
        self.check(posting)?;
        let draft = posting.draft.clone();
        let now = Utc::now();

        if let Some(existing) = self.postings.iter_mut().find(|p| {
            p.source_id == posting.source_id && p.source_job_id == draft.source_job_id
        }) {
            existing.title = draft.title;
            existing.company = draft.company;
            existing.location = draft.location;
            existing.description = draft.description;
            existing.tags = draft.tags;
            existing.apply_url = draft.apply_url;
            existing.salary_min = draft.salary_min;
            existing.salary_max = draft.salary_max;
            existing.salary_currency = draft.salary_currency;
            existing.job_type = draft.job_type;
            existing.remote_type = draft.remote_type;
            existing.experience_level = draft.experience_level;
            existing.posted_at = draft.posted_at;
            existing.updated_at = now;
            return Ok(existing.id);
        }

        self.next_id += 1;
        let id = self.next_id;
        self.postings.push(JobPosting {
            id,
            title: draft.title,
            company: draft.company,
            location: draft.location,
            description: draft.description,
            tags: draft.tags,
            source_id: posting.source_id,
            source_job_id: draft.source_job_id,
            apply_url: draft.apply_url,
            salary_min: draft.salary_min,
            salary_max: draft.salary_max,
            salary_currency: draft.salary_currency,
            job_type: draft.job_type,
            remote_type: draft.remote_type,
            experience_level: draft.experience_level,
            posted_at: draft.posted_at,
            is_active: true,
            created_at: now,
            updated_at: now,
        });
        Ok(id)
    }
}

#[async_trait]
impl JobStore for MemoryStore {
    async fn resolve_source(&self, name: &str) -> Result<JobSource, AppError> {
        self.source(name)
            .await
            .ok_or_else(|| AppError::NotFound(format!("Source '{name}' not found")))
    }

    async fn upsert(&self, postings: &[NewJobPosting]) -> Result<Vec<i32>, AppError> {
        if postings.is_empty() {
            return Ok(Vec::new());
        }

        let mut state = self.state.lock().await;
        let mut ids = Vec::with_capacity(postings.len());
        for posting in postings {
            match state.upsert_one(posting) {
                Ok(id) => ids.push(id),
                Err(e) => tracing::warn!(
                    "Failed to upsert posting '{}' ({}): {e}",
                    posting.draft.title,
                    posting.draft.source_job_id
                ),
            }
        }
        Ok(ids)
    }

    async fn mark_fetched(&self, source_id: i32) -> Result<(), AppError> {
        let mut state = self.state.lock().await;
        let source = state
            .sources
            .iter_mut()
            .find(|s| s.id == source_id)
            .ok_or_else(|| AppError::NotFound(format!("Source {source_id} not found")))?;
        let now = Utc::now();
        source.last_fetched = Some(now);
        source.updated_at = now;
        Ok(())
    }

    async fn record_run(&self, report: &RunReport) -> Result<(), AppError> {
        self.state.lock().await.runs.push(report.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::job::{ExperienceLevel, JobDraft, JobType, RemoteType};

    fn draft(id: &str, title: &str) -> JobDraft {
        JobDraft {
            title: title.to_string(),
            company: "Acme".into(),
            location: "Remote".into(),
            description: String::new(),
            tags: vec![],
            source_job_id: id.to_string(),
            apply_url: String::new(),
            salary_min: None,
            salary_max: None,
            salary_currency: "USD".into(),
            job_type: JobType::FullTime,
            remote_type: RemoteType::Remote,
            experience_level: ExperienceLevel::Mid,
            posted_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn updates_in_place_and_keeps_created_at() {
        let store = MemoryStore::with_default_sources();
        let first = store.upsert(&[draft("a", "Engineer").attach(1)]).await.unwrap();
        let created = store.postings().await[0].created_at;

        let second = store
            .upsert(&[draft("a", "Staff Engineer").attach(1)])
            .await
            .unwrap();

        assert_eq!(first, second);
        let postings = store.postings().await;
        assert_eq!(postings.len(), 1);
        assert_eq!(postings[0].title, "Staff Engineer");
        assert_eq!(postings[0].created_at, created);
    }

    #[tokio::test]
    async fn same_native_id_under_different_sources_is_distinct() {
        let store = MemoryStore::with_default_sources();
        let ids = store
            .upsert(&[draft("42", "Dev").attach(1), draft("42", "Dev").attach(2)])
            .await
            .unwrap();
        assert_eq!(ids.len(), 2);
        assert_ne!(ids[0], ids[1]);
    }

    #[tokio::test]
    async fn rejects_constraint_violations() {
        let store = MemoryStore::with_default_sources();
        let ids = store
            .upsert(&[
                draft("", "No id").attach(1),
                draft("x", "").attach(1),
                draft("y", "Orphan").attach(99),
                draft("z", "Valid").attach(3),
            ])
            .await
            .unwrap();
        assert_eq!(ids.len(), 1);
    }

    #[tokio::test]
    async fn mark_fetched_and_resolve() {
        let store = MemoryStore::with_default_sources();
        let source = store.resolve_source("RemoteYeah").await.unwrap();
        assert!(source.last_fetched.is_none());

        store.mark_fetched(source.id).await.unwrap();
        assert!(store.source("RemoteYeah").await.unwrap().last_fetched.is_some());

        assert!(matches!(
            store.resolve_source("Monster").await,
            Err(AppError::NotFound(_))
        ));
        assert!(store.mark_fetched(77).await.is_err());
    }
}
