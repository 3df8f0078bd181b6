//! Job runner: the queued execution path.
//!
//! `submit` persists a PENDING job and hands its id to an in-process
//! dispatcher. The dispatcher spawns one task per job, bounded by a
//! semaphore. Workers own every state transition; `status` only reads.

use chrono::Utc;
use std::any::Any;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot, Semaphore};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, instrument, warn};

use crate::domain::errors::{DomainError, DomainResult, ResolutionError};
use crate::domain::models::{Job, JobId, ResolutionRequest};
use crate::domain::ports::{JobFilter, JobRepository};
use crate::services::resolution_pipeline::{Resolution, ResolutionPipeline};

/// Front of the job queue, cheap to clone.
#[derive(Clone)]
pub struct JobRunner {
    repo: Arc<dyn JobRepository>,
    queue: Option<mpsc::UnboundedSender<JobId>>,
}

impl JobRunner {
    /// A runner without workers. It can inspect and administer jobs;
    /// submitted jobs wait for a process that runs workers.
    pub fn new(repo: Arc<dyn JobRepository>) -> Self {
        Self { repo, queue: None }
    }

    /// A runner backed by a pool of `workers` concurrent executors.
    pub fn with_workers(
        repo: Arc<dyn JobRepository>,
        pipeline: Arc<ResolutionPipeline>,
        workers: usize,
    ) -> (Self, WorkerPool) {
        let (tx, rx) = mpsc::unbounded_channel();
        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let workers = workers.max(1);

        let dispatcher = tokio::spawn(dispatch(
            Arc::clone(&repo),
            pipeline,
            rx,
            shutdown_rx,
            workers,
        ));

        let runner = Self {
            repo,
            queue: Some(tx),
        };
        let pool = WorkerPool {
            shutdown: Some(shutdown_tx),
            dispatcher,
        };
        (runner, pool)
    }

    /// Persist a new PENDING job and enqueue it.
    #[instrument(skip(self, request), fields(format = %request.format))]
    pub async fn submit(&self, request: ResolutionRequest) -> DomainResult<Job> {
        let job = Job::new(request);
        self.repo.insert(&job).await?;
        self.enqueue(job.id)?;
        info!(job_id = %job.id, "Job submitted");
        Ok(job)
    }

    /// Current view of a job. `None` if the id is unknown or expired.
    pub async fn status(&self, id: JobId) -> DomainResult<Option<Job>> {
        self.repo.get(id).await
    }

    /// Cancel a job that has not started yet.
    #[instrument(skip(self))]
    pub async fn revoke(&self, id: JobId) -> DomainResult<bool> {
        let revoked = self.repo.revoke(id).await?;
        if revoked {
            info!(job_id = %id, "Job revoked");
        }
        Ok(revoked)
    }

    pub async fn list(&self, filter: &JobFilter) -> DomainResult<Vec<Job>> {
        self.repo.list(filter).await
    }

    /// Delete terminal jobs that completed more than `older_than` ago.
    pub async fn purge_expired(&self, older_than: Duration) -> DomainResult<u64> {
        let cutoff = chrono::Duration::from_std(older_than)
            .ok()
            .and_then(|age| Utc::now().checked_sub_signed(age))
            .ok_or_else(|| {
                DomainError::InvalidAge(format!("{}s is out of range", older_than.as_secs()))
            })?;
        self.repo.purge_completed_before(cutoff).await
    }

    /// Requeue work left behind by a previous process: jobs stuck in
    /// STARTED go to RETRY, then every PENDING/RETRY job is enqueued.
    #[instrument(skip(self))]
    pub async fn recover(&self) -> DomainResult<usize> {
        let ids = self.repo.requeue_interrupted().await?;
        for id in &ids {
            self.enqueue(*id)?;
        }
        if !ids.is_empty() {
            info!(count = ids.len(), "Recovered queued jobs");
        }
        Ok(ids.len())
    }

    fn enqueue(&self, id: JobId) -> DomainResult<()> {
        match &self.queue {
            Some(queue) => queue.send(id).map_err(|_| {
                DomainError::QueueUnavailable("worker pool has shut down".to_string())
            }),
            None => {
                debug!(job_id = %id, "No local workers, job stays queued");
                Ok(())
            }
        }
    }
}

impl std::fmt::Debug for JobRunner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JobRunner")
            .field("has_workers", &self.queue.is_some())
            .finish_non_exhaustive()
    }
}

/// Handle to the dispatcher task. Dropping it also stops dispatching.
#[derive(Debug)]
pub struct WorkerPool {
    shutdown: Option<oneshot::Sender<()>>,
    dispatcher: JoinHandle<()>,
}

impl WorkerPool {
    /// Stop taking new jobs and wait for running ones to finish.
    pub async fn shutdown(mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        if let Err(e) = self.dispatcher.await {
            error!(error = %e, "Job dispatcher terminated abnormally");
        }
    }
}

async fn dispatch(
    repo: Arc<dyn JobRepository>,
    pipeline: Arc<ResolutionPipeline>,
    mut rx: mpsc::UnboundedReceiver<JobId>,
    mut shutdown: oneshot::Receiver<()>,
    workers: usize,
) {
    let semaphore = Arc::new(Semaphore::new(workers));
    info!(workers, "Job dispatcher started");

    loop {
        let id = tokio::select! {
            _ = &mut shutdown => break,
            next = rx.recv() => match next {
                Some(id) => id,
                None => break,
            },
        };

        let Ok(permit) = Arc::clone(&semaphore).acquire_owned().await else {
            break;
        };

        let repo = Arc::clone(&repo);
        let pipeline = Arc::clone(&pipeline);
        tokio::spawn(async move {
            let _permit = permit;
            execute(repo, pipeline, id).await;
        });
    }

    // Every permit back means every running job has finished.
    let permits = u32::try_from(workers).unwrap_or(u32::MAX);
    let _ = semaphore.acquire_many(permits).await;
    info!("Job dispatcher stopped");
}

/// Run one job from claim to terminal state.
#[instrument(skip(repo, pipeline))]
async fn execute(repo: Arc<dyn JobRepository>, pipeline: Arc<ResolutionPipeline>, id: JobId) {
    let job = match repo.get(id).await {
        Ok(Some(job)) => job,
        Ok(None) => {
            warn!("Job vanished before it could run");
            return;
        }
        Err(e) => {
            error!(error = %e, "Failed to load job");
            return;
        }
    };

    match repo.claim(id).await {
        Ok(true) => {}
        Ok(false) => {
            debug!(state = %job.state, "Job not claimable, skipping");
            return;
        }
        Err(e) => {
            error!(error = %e, "Failed to claim job");
            return;
        }
    }

    let request = job.request;
    let outcome = tokio::spawn(async move { pipeline.resolve(&request).await }).await;

    let stored = match outcome {
        Ok(Ok(Resolution::Rendered(payload))) => {
            info!("Job succeeded");
            repo.complete(id, Some(&payload)).await
        }
        Ok(Ok(Resolution::NotFound)) => {
            info!("Job succeeded, entity not found");
            repo.complete(id, None).await
        }
        Ok(Err(err)) => {
            warn!(error = %err, "Job failed");
            repo.fail(id, &diagnostic(err)).await
        }
        Err(join_err) => {
            let detail = if join_err.is_panic() {
                format!("worker panicked: {}", panic_message(join_err.into_panic()))
            } else {
                "worker task was cancelled".to_string()
            };
            error!(detail = %detail, "Job aborted");
            repo.fail(id, &detail).await
        }
    };

    match stored {
        Ok(true) => {}
        Ok(false) => warn!("Job left STARTED before its result was stored"),
        Err(e) => error!(error = %e, "Failed to store job result"),
    }
}

/// Full error chain, as returned to callers polling a failed job.
fn diagnostic(err: ResolutionError) -> String {
    format!("{:?}", anyhow::Error::from(err))
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
