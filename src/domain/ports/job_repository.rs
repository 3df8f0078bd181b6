//! Job repository port.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::errors::DomainResult;
use crate::domain::models::{Job, JobId, JobState};

/// Filter for listing jobs.
#[derive(Debug, Clone, Default)]
pub struct JobFilter {
    pub state: Option<JobState>,
    pub limit: Option<usize>,
}

/// Result backend of the job queue.
///
/// State-changing methods are conditional on the current state and report
/// whether the transition happened, so concurrent writers never clobber a
/// state they did not expect.
#[async_trait]
pub trait JobRepository: Send + Sync {
    /// Insert a new job record.
    async fn insert(&self, job: &Job) -> DomainResult<()>;

    /// Get a job by ID.
    async fn get(&self, id: JobId) -> DomainResult<Option<Job>>;

    /// PENDING or RETRY -> STARTED. False if the job cannot be claimed.
    async fn claim(&self, id: JobId) -> DomainResult<bool>;

    /// STARTED -> SUCCESS with the payload (None = not found).
    async fn complete(&self, id: JobId, result: Option<&str>) -> DomainResult<bool>;

    /// STARTED -> FAILURE with the diagnostic.
    async fn fail(&self, id: JobId, detail: &str) -> DomainResult<bool>;

    /// PENDING or RETRY -> REVOKED.
    async fn revoke(&self, id: JobId) -> DomainResult<bool>;

    /// Move every STARTED job to RETRY and return all PENDING/RETRY ids,
    /// oldest first.
    async fn requeue_interrupted(&self) -> DomainResult<Vec<JobId>>;

    /// List jobs, newest first.
    async fn list(&self, filter: &JobFilter) -> DomainResult<Vec<Job>>;

    /// Delete terminal jobs completed before `cutoff`. Returns the count.
    async fn purge_completed_before(&self, cutoff: DateTime<Utc>) -> DomainResult<u64>;
}
