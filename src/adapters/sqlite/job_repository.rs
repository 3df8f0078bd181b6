//! SQLite implementation of the JobRepository.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{Job, JobId, JobState, ResolutionRequest};
use crate::domain::ports::{JobFilter, JobRepository};

use super::{format_datetime, parse_datetime, parse_optional_datetime, parse_uuid};

pub struct SqliteJobRepository {
    pool: SqlitePool,
}

impl SqliteJobRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl JobRepository for SqliteJobRepository {
    async fn insert(&self, job: &Job) -> DomainResult<()> {
        let request = serde_json::to_string(&job.request)?;

        sqlx::query(
            r#"INSERT INTO jobs (id, state, request, result, created_at, updated_at, started_at, completed_at)
               VALUES (?, ?, ?, ?, ?, ?, ?, ?)"#
        )
        .bind(job.id.to_string())
        .bind(job.state.as_str())
        .bind(request)
        .bind(&job.result)
        .bind(format_datetime(job.created_at))
        .bind(format_datetime(job.updated_at))
        .bind(job.started_at.map(format_datetime))
        .bind(job.completed_at.map(format_datetime))
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn get(&self, id: JobId) -> DomainResult<Option<Job>> {
        let row: Option<JobRow> = sqlx::query_as("SELECT * FROM jobs WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await?;

        row.map(TryInto::try_into).transpose()
    }

    async fn claim(&self, id: JobId) -> DomainResult<bool> {
        let now = format_datetime(Utc::now());
        let sql = format!(
            "UPDATE jobs SET state = ?, started_at = ?, updated_at = ?
             WHERE id = ? AND state IN ({})",
            state_list(&JobState::sources_of(JobState::Started))
        );
        let result = sqlx::query(&sql)
            .bind(JobState::Started.as_str())
            .bind(&now)
            .bind(&now)
            .bind(id.to_string())
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn complete(&self, id: JobId, result: Option<&str>) -> DomainResult<bool> {
        self.finish(id, JobState::Success, result).await
    }

    async fn fail(&self, id: JobId, detail: &str) -> DomainResult<bool> {
        self.finish(id, JobState::Failure, Some(detail)).await
    }

    async fn revoke(&self, id: JobId) -> DomainResult<bool> {
        let now = format_datetime(Utc::now());
        let sql = format!(
            "UPDATE jobs SET state = ?, updated_at = ?, completed_at = ?
             WHERE id = ? AND state IN ({})",
            state_list(&JobState::sources_of(JobState::Revoked))
        );
        let result = sqlx::query(&sql)
            .bind(JobState::Revoked.as_str())
            .bind(&now)
            .bind(&now)
            .bind(id.to_string())
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn requeue_interrupted(&self) -> DomainResult<Vec<JobId>> {
        let requeue = format!(
            "UPDATE jobs SET state = ?, updated_at = ? WHERE state IN ({})",
            state_list(&JobState::sources_of(JobState::Retry))
        );
        sqlx::query(&requeue)
            .bind(JobState::Retry.as_str())
            .bind(format_datetime(Utc::now()))
            .execute(&self.pool)
            .await?;

        let claimable = format!(
            "SELECT id FROM jobs WHERE state IN ({}) ORDER BY created_at",
            state_list(&JobState::sources_of(JobState::Started))
        );
        let rows: Vec<(String,)> = sqlx::query_as(&claimable)
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter()
            .map(|(id,)| parse_uuid(&id).map(JobId::from))
            .collect()
    }

    async fn list(&self, filter: &JobFilter) -> DomainResult<Vec<Job>> {
        let limit = filter.limit.map_or(-1, |l| i64::try_from(l).unwrap_or(i64::MAX));

        let rows: Vec<JobRow> = match filter.state {
            Some(state) => sqlx::query_as(
                "SELECT * FROM jobs WHERE state = ? ORDER BY created_at DESC LIMIT ?"
            )
            .bind(state.as_str())
            .bind(limit)
            .fetch_all(&self.pool)
            .await?,
            None => sqlx::query_as("SELECT * FROM jobs ORDER BY created_at DESC LIMIT ?")
                .bind(limit)
                .fetch_all(&self.pool)
                .await?,
        };

        rows.into_iter().map(TryInto::try_into).collect()
    }

    async fn purge_completed_before(&self, cutoff: DateTime<Utc>) -> DomainResult<u64> {
        let sql = format!(
            "DELETE FROM jobs
             WHERE state IN ({}) AND completed_at IS NOT NULL AND completed_at < ?",
            state_list(&JobState::terminal_states())
        );
        let result = sqlx::query(&sql)
            .bind(format_datetime(cutoff))
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }
}

impl SqliteJobRepository {
    /// Move a STARTED job to a terminal state. `Ok(false)` means the job
    /// was no longer STARTED.
    async fn finish(&self, id: JobId, state: JobState, result: Option<&str>) -> DomainResult<bool> {
        if !JobState::Started.can_transition_to(state) || !state.is_terminal() {
            return Err(DomainError::InvalidStateTransition {
                id,
                from: JobState::Started,
                to: state,
            });
        }

        let now = format_datetime(Utc::now());
        let sql = format!(
            "UPDATE jobs SET state = ?, result = ?, updated_at = ?, completed_at = ?
             WHERE id = ? AND state IN ({})",
            state_list(&JobState::sources_of(state))
        );
        let outcome = sqlx::query(&sql)
            .bind(state.as_str())
            .bind(result)
            .bind(&now)
            .bind(&now)
            .bind(id.to_string())
            .execute(&self.pool)
            .await?;

        Ok(outcome.rows_affected() == 1)
    }
}

/// Quoted state names for an `IN (...)` clause.
fn state_list(states: &[JobState]) -> String {
    states
        .iter()
        .map(|state| format!("'{}'", state.as_str()))
        .collect::<Vec<_>>()
        .join(", ")
}

#[derive(sqlx::FromRow)]
struct JobRow {
    id: String,
    state: String,
    request: String,
    result: Option<String>,
    created_at: String,
    updated_at: String,
    started_at: Option<String>,
    completed_at: Option<String>,
}

impl TryFrom<JobRow> for Job {
    type Error = DomainError;

    fn try_from(row: JobRow) -> Result<Self, Self::Error> {
        let state = JobState::from_str(&row.state)
            .ok_or_else(|| DomainError::SerializationError(format!("Invalid job state: {}", row.state)))?;
        let request: ResolutionRequest = serde_json::from_str(&row.request)?;

        Ok(Job {
            id: parse_uuid(&row.id)?.into(),
            state,
            request,
            result: row.result,
            created_at: parse_datetime(&row.created_at)?,
            updated_at: parse_datetime(&row.updated_at)?,
            started_at: parse_optional_datetime(row.started_at)?,
            completed_at: parse_optional_datetime(row.completed_at)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::sqlite::{all_embedded_migrations, create_test_pool, Migrator};
    use crate::domain::models::{Locator, OutputFormat};

    async fn setup_test_repo() -> SqliteJobRepository {
        let pool = create_test_pool().await.unwrap();
        let migrator = Migrator::new(pool.clone());
        migrator.run_embedded_migrations(all_embedded_migrations()).await.unwrap();
        SqliteJobRepository::new(pool)
    }

    fn sample_job() -> Job {
        Job::new(ResolutionRequest::for_test(
            Locator::new("https://example.com/repo", "/tests/smoke").with_path("/meta"),
            OutputFormat::Yaml,
        ))
    }

    #[tokio::test]
    async fn test_insert_and_get() {
        let repo = setup_test_repo().await;
        let job = sample_job();
        repo.insert(&job).await.unwrap();

        let stored = repo.get(job.id).await.unwrap().unwrap();
        assert_eq!(stored.id, job.id);
        assert_eq!(stored.state, JobState::Pending);
        assert_eq!(stored.request, job.request);
        assert!(stored.result.is_none());
    }

    #[tokio::test]
    async fn test_get_unknown_returns_none() {
        let repo = setup_test_repo().await;
        assert!(repo.get(JobId::new()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_lifecycle_success() {
        let repo = setup_test_repo().await;
        let job = sample_job();
        repo.insert(&job).await.unwrap();

        assert!(repo.claim(job.id).await.unwrap());
        assert!(!repo.claim(job.id).await.unwrap(), "a started job cannot be claimed twice");

        let started = repo.get(job.id).await.unwrap().unwrap();
        assert_eq!(started.state, JobState::Started);
        assert!(started.started_at.is_some());

        assert!(repo.complete(job.id, Some("name: /tests/smoke\n")).await.unwrap());
        let done = repo.get(job.id).await.unwrap().unwrap();
        assert_eq!(done.state, JobState::Success);
        assert_eq!(done.result.as_deref(), Some("name: /tests/smoke\n"));
        assert!(done.completed_at.is_some());

        assert!(!repo.fail(job.id, "late failure").await.unwrap(), "terminal state is final");
        assert_eq!(repo.get(job.id).await.unwrap().unwrap(), done);
    }

    #[tokio::test]
    async fn test_not_found_success_has_null_result() {
        let repo = setup_test_repo().await;
        let job = sample_job();
        repo.insert(&job).await.unwrap();
        repo.claim(job.id).await.unwrap();
        repo.complete(job.id, None).await.unwrap();

        let done = repo.get(job.id).await.unwrap().unwrap();
        assert!(done.is_not_found());
    }

    #[tokio::test]
    async fn test_completion_requires_started() {
        let repo = setup_test_repo().await;
        let job = sample_job();
        repo.insert(&job).await.unwrap();

        assert!(!repo.complete(job.id, Some("x")).await.unwrap());
        assert_eq!(repo.get(job.id).await.unwrap().unwrap().state, JobState::Pending);
    }

    #[tokio::test]
    async fn test_finish_refuses_non_terminal_target() {
        let repo = setup_test_repo().await;
        let job = sample_job();
        repo.insert(&job).await.unwrap();
        repo.claim(job.id).await.unwrap();

        for target in [JobState::Retry, JobState::Revoked, JobState::Pending] {
            match repo.finish(job.id, target, None).await {
                Err(DomainError::InvalidStateTransition { id, from, to }) => {
                    assert_eq!(id, job.id);
                    assert_eq!(from, JobState::Started);
                    assert_eq!(to, target);
                }
                other => panic!("Expected InvalidStateTransition, got {other:?}"),
            }
        }
        assert_eq!(repo.get(job.id).await.unwrap().unwrap().state, JobState::Started);
    }

    #[test]
    fn test_state_list_quotes_names() {
        assert_eq!(
            state_list(&JobState::sources_of(JobState::Started)),
            "'PENDING', 'RETRY'"
        );
    }

    #[tokio::test]
    async fn test_revoked_job_cannot_be_claimed() {
        let repo = setup_test_repo().await;
        let job = sample_job();
        repo.insert(&job).await.unwrap();

        assert!(repo.revoke(job.id).await.unwrap());
        assert!(!repo.claim(job.id).await.unwrap());
        assert_eq!(repo.get(job.id).await.unwrap().unwrap().state, JobState::Revoked);
    }

    #[tokio::test]
    async fn test_requeue_interrupted() {
        let repo = setup_test_repo().await;
        let pending = sample_job();
        let interrupted = sample_job();
        let finished = sample_job();
        for job in [&pending, &interrupted, &finished] {
            repo.insert(job).await.unwrap();
        }
        repo.claim(interrupted.id).await.unwrap();
        repo.claim(finished.id).await.unwrap();
        repo.complete(finished.id, Some("done")).await.unwrap();

        let ids = repo.requeue_interrupted().await.unwrap();
        assert_eq!(ids.len(), 2);
        assert!(ids.contains(&pending.id));
        assert!(ids.contains(&interrupted.id));
        assert_eq!(repo.get(interrupted.id).await.unwrap().unwrap().state, JobState::Retry);
        assert!(repo.claim(interrupted.id).await.unwrap());
    }

    #[tokio::test]
    async fn test_list_with_filter() {
        let repo = setup_test_repo().await;
        let a = sample_job();
        let b = sample_job();
        repo.insert(&a).await.unwrap();
        repo.insert(&b).await.unwrap();
        repo.claim(b.id).await.unwrap();

        let all = repo.list(&JobFilter::default()).await.unwrap();
        assert_eq!(all.len(), 2);

        let started = repo
            .list(&JobFilter { state: Some(JobState::Started), limit: None })
            .await
            .unwrap();
        assert_eq!(started.len(), 1);
        assert_eq!(started[0].id, b.id);

        let limited = repo.list(&JobFilter { state: None, limit: Some(1) }).await.unwrap();
        assert_eq!(limited.len(), 1);
    }

    #[tokio::test]
    async fn test_purge_only_old_terminal_jobs() {
        let repo = setup_test_repo().await;
        let done = sample_job();
        let pending = sample_job();
        repo.insert(&done).await.unwrap();
        repo.insert(&pending).await.unwrap();
        repo.claim(done.id).await.unwrap();
        repo.complete(done.id, Some("x")).await.unwrap();

        let purged = repo
            .purge_completed_before(Utc::now() - chrono::Duration::hours(1))
            .await
            .unwrap();
        assert_eq!(purged, 0);

        let purged = repo
            .purge_completed_before(Utc::now() + chrono::Duration::seconds(1))
            .await
            .unwrap();
        assert_eq!(purged, 1);
        assert!(repo.get(done.id).await.unwrap().is_none());
        assert!(repo.get(pending.id).await.unwrap().is_some());
    }
}
