//! Request gateway: validate, then resolve inline or submit a job.
//!
//! The output format of a request travels with that request (and with its
//! persisted job). Nothing about one request's format is remembered for
//! the next.

use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, instrument};

use crate::domain::errors::{DomainError, ResolutionError};
use crate::domain::models::{
    ExecutionMode, JobDescriptor, JobId, OutputFormat, RequestError, RequestParams,
};
use crate::domain::ports::StatusPageRenderer;
use crate::services::job_runner::JobRunner;
use crate::services::resolution_pipeline::ResolutionPipeline;

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error(transparent)]
    Request(#[from] RequestError),

    #[error("Unknown job: {0}")]
    UnknownJob(String),

    #[error(transparent)]
    Resolution(#[from] ResolutionError),

    #[error(transparent)]
    Queue(#[from] DomainError),
}

/// What the gateway answers with, independent of transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GatewayResponse {
    /// Synchronous resolution. `None` body means the entity was not found.
    Rendered {
        format: OutputFormat,
        body: Option<String>,
    },
    /// Job descriptor: a queued submission or a status poll.
    Job(JobDescriptor),
    /// HTML status page of a job.
    StatusPage(String),
}

/// Settings the gateway reads once at startup.
#[derive(Debug, Clone)]
pub struct GatewaySettings {
    pub mode: ExecutionMode,
    /// Base URL for callback links, without a trailing slash.
    pub api_hostname: String,
}

pub struct RequestGateway {
    settings: GatewaySettings,
    pipeline: Arc<ResolutionPipeline>,
    /// Absent in synchronous mode, where no job store is opened.
    runner: Option<JobRunner>,
    status_pages: Arc<dyn StatusPageRenderer>,
}

impl RequestGateway {
    pub fn new(
        settings: GatewaySettings,
        pipeline: Arc<ResolutionPipeline>,
        runner: Option<JobRunner>,
        status_pages: Arc<dyn StatusPageRenderer>,
    ) -> Self {
        let settings = GatewaySettings {
            api_hostname: settings.api_hostname.trim_end_matches('/').to_string(),
            ..settings
        };
        Self {
            settings,
            pipeline,
            runner,
            status_pages,
        }
    }

    pub fn mode(&self) -> ExecutionMode {
        self.settings.mode
    }

    /// Handle a resolution request.
    ///
    /// Validation happens before anything is fetched or submitted.
    #[instrument(skip(self, params), fields(mode = self.settings.mode.as_str()))]
    pub async fn handle(&self, params: RequestParams) -> Result<GatewayResponse, GatewayError> {
        let request = params.validate()?;
        let format = request.format;

        match self.settings.mode {
            ExecutionMode::Synchronous => {
                let resolution = self.pipeline.resolve(&request).await?;
                Ok(GatewayResponse::Rendered {
                    format,
                    body: resolution.into_payload(),
                })
            }
            ExecutionMode::Queued => {
                let runner = self.runner.as_ref().ok_or_else(|| {
                    DomainError::QueueUnavailable("no job store is configured".to_string())
                })?;
                let job = runner.submit(request).await?;
                if format == OutputFormat::Html {
                    let page = self
                        .status_pages
                        .render_status_page(&job, &self.html_callback_url(job.id))
                        .map_err(ResolutionError::from)?;
                    Ok(GatewayResponse::StatusPage(page))
                } else {
                    Ok(GatewayResponse::Job(JobDescriptor::from_job(
                        &job,
                        self.status_callback_url(job.id),
                    )))
                }
            }
        }
    }

    /// Look up a job. With `html`, answer with its status page.
    #[instrument(skip(self))]
    pub async fn status(
        &self,
        task_id: Option<&str>,
        html: bool,
    ) -> Result<GatewayResponse, GatewayError> {
        let task_id = task_id
            .ok_or_else(|| RequestError::MissingArguments("task-id is required".to_string()))?;
        let id: JobId = task_id
            .parse()
            .map_err(|_| GatewayError::UnknownJob(task_id.to_string()))?;

        let Some(runner) = &self.runner else {
            return Err(GatewayError::UnknownJob(task_id.to_string()));
        };
        let job = runner
            .status(id)
            .await?
            .ok_or_else(|| GatewayError::UnknownJob(task_id.to_string()))?;
        debug!(state = %job.state, "Job polled");

        if html {
            let page = self
                .status_pages
                .render_status_page(&job, &self.html_callback_url(id))
                .map_err(ResolutionError::from)?;
            Ok(GatewayResponse::StatusPage(page))
        } else {
            Ok(GatewayResponse::Job(JobDescriptor::from_job(
                &job,
                self.status_callback_url(id),
            )))
        }
    }

    pub fn status_callback_url(&self, id: JobId) -> String {
        format!("{}/status?task-id={id}", self.settings.api_hostname)
    }

    pub fn html_callback_url(&self, id: JobId) -> String {
        format!("{}/status/html?task-id={id}", self.settings.api_hostname)
    }
}

impl std::fmt::Debug for RequestGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestGateway")
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}
