//! Composition root for the service.
//!
//! In queued mode the host also opens the job store, owns the worker pool
//! and the retention sweeper, and recovers jobs left behind by a previous
//! process. Synchronous mode never touches the job store.

use anyhow::{Context, Result};
use std::path::Path;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::adapters::fmf::FmfTreeLoader;
use crate::adapters::git::GitRepositoryFetcher;
use crate::adapters::renderers::{HtmlRenderer, RendererRegistry};
use crate::adapters::sqlite::{initialize_database, SqliteJobRepository};
use crate::domain::models::{Config, DatabaseConfig, ExecutionMode};
use crate::domain::ports::JobRepository;
use crate::services::{
    GatewaySettings, JobRunner, RequestGateway, ResolutionPipeline, RetentionSweeper,
    SweeperHandle, WorkerPool,
};

/// Pipeline with the git fetcher, fmf trees and the default renderers.
pub fn build_pipeline(config: &Config) -> Result<ResolutionPipeline> {
    let renderers = RendererRegistry::with_defaults(config.execution.status_refresh_secs)
        .context("Failed to compile templates")?;
    Ok(ResolutionPipeline::new(
        Arc::new(GitRepositoryFetcher::new(&config.fetcher)),
        Arc::new(FmfTreeLoader::new()),
        renderers,
    ))
}

/// Open the job database, applying migrations.
pub async fn open_job_repository(config: &DatabaseConfig) -> Result<Arc<SqliteJobRepository>> {
    let pool = initialize_database(Path::new(&config.path), config.max_connections)
        .await
        .with_context(|| format!("Failed to open job database at {}", config.path))?;
    Ok(Arc::new(SqliteJobRepository::new(pool)))
}

/// Running service: the gateway plus whatever background work the
/// execution mode needs.
pub struct ServiceHost {
    gateway: Arc<RequestGateway>,
    workers: Option<WorkerPool>,
    sweeper: Option<(SweeperHandle, JoinHandle<()>)>,
}

impl ServiceHost {
    /// Start with the production adapters.
    pub async fn start(config: &Config) -> Result<Self> {
        let pipeline = Arc::new(build_pipeline(config)?);
        let repo: Option<Arc<dyn JobRepository>> = match config.execution.mode {
            ExecutionMode::Synchronous => None,
            ExecutionMode::Queued => Some(open_job_repository(&config.database).await?),
        };
        Self::assemble(config, pipeline, repo).await
    }

    /// Start around an existing pipeline and job repository. Queued mode
    /// requires the repository.
    pub async fn assemble(
        config: &Config,
        pipeline: Arc<ResolutionPipeline>,
        repo: Option<Arc<dyn JobRepository>>,
    ) -> Result<Self> {
        let status_pages = Arc::new(
            HtmlRenderer::new(config.execution.status_refresh_secs)
                .context("Failed to compile status page template")?,
        );
        let mode = config.execution.mode;

        let (runner, workers, sweeper) = match (mode, repo) {
            (ExecutionMode::Synchronous, repo) => (repo.map(JobRunner::new), None, None),
            (ExecutionMode::Queued, None) => {
                anyhow::bail!("Queued mode needs a job repository")
            }
            (ExecutionMode::Queued, Some(repo)) => {
                let (runner, workers) =
                    JobRunner::with_workers(repo, Arc::clone(&pipeline), config.execution.workers);
                runner
                    .recover()
                    .await
                    .context("Failed to recover queued jobs")?;

                let sweeper = RetentionSweeper::new(runner.clone(), (&config.retention).into());
                let handle = sweeper.handle();
                let join = sweeper.spawn();
                (Some(runner), Some(workers), Some((handle, join)))
            }
        };

        let gateway = RequestGateway::new(
            GatewaySettings {
                mode,
                api_hostname: config.server.api_hostname.clone(),
            },
            pipeline,
            runner,
            status_pages,
        );

        info!(mode = mode.as_str(), "Service ready");
        Ok(Self {
            gateway: Arc::new(gateway),
            workers,
            sweeper,
        })
    }

    pub fn gateway(&self) -> Arc<RequestGateway> {
        Arc::clone(&self.gateway)
    }

    /// Stop background work, letting running jobs finish.
    pub async fn shutdown(self) {
        if let Some((handle, join)) = self.sweeper {
            handle.stop();
            if let Err(e) = join.await {
                warn!(error = %e, "Retention sweeper ended abnormally");
            }
        }
        if let Some(workers) = self.workers {
            workers.shutdown().await;
        }
        info!("Service stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_with_store(mode: ExecutionMode, dir: &Path) -> Config {
        let mut config = Config::default();
        config.execution.mode = mode;
        config.database.path = dir.join("jobs.db").to_string_lossy().to_string();
        config
    }

    #[tokio::test]
    async fn test_synchronous_mode_leaves_job_store_alone() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_with_store(ExecutionMode::Synchronous, dir.path());

        let host = ServiceHost::start(&config).await.unwrap();
        assert!(!dir.path().join("jobs.db").exists());
        host.shutdown().await;
    }

    #[tokio::test]
    async fn test_queued_mode_opens_job_store() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_with_store(ExecutionMode::Queued, dir.path());

        let host = ServiceHost::start(&config).await.unwrap();
        assert!(dir.path().join("jobs.db").is_file());
        host.shutdown().await;
    }

    #[tokio::test]
    async fn test_queued_mode_requires_repository() {
        let config = Config::default();
        let pipeline = Arc::new(build_pipeline(&config).unwrap());
        assert!(ServiceHost::assemble(&config, pipeline, None).await.is_err());
    }
}
