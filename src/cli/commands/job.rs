//! Job CLI commands.

use anyhow::{anyhow, Result};
use clap::{Args, Subcommand};
use std::time::Duration;

use crate::application::open_job_repository;
use crate::cli::output::{list_table, output, state_cell, truncate, CommandOutput};
use crate::cli::parse_job_id;
use crate::domain::models::{Config, Job, JobState};
use crate::domain::ports::JobFilter;
use crate::services::JobRunner;

#[derive(Args, Debug)]
pub struct JobArgs {
    #[command(subcommand)]
    pub command: JobCommands,
}

#[derive(Subcommand, Debug)]
pub enum JobCommands {
    /// Show one job
    Status {
        /// Job ID
        id: String,
    },
    /// List jobs, newest first
    List {
        /// Filter by state (PENDING, STARTED, SUCCESS, FAILURE, RETRY, REVOKED)
        #[arg(short, long)]
        state: Option<String>,
        /// Maximum number of jobs to display
        #[arg(short, long, default_value = "50")]
        limit: usize,
    },
    /// Cancel a job that has not started
    Revoke {
        /// Job ID
        id: String,
    },
    /// Delete finished jobs past retention
    Purge {
        /// Age in seconds (defaults to retention.result_expires_secs)
        #[arg(long)]
        older_than_secs: Option<u64>,
    },
}

#[derive(Debug, serde::Serialize)]
pub struct JobOutput {
    pub id: String,
    pub state: String,
    pub format: String,
    pub test: Option<String>,
    pub plan: Option<String>,
    pub result: Option<String>,
    pub created_at: String,
    pub started_at: Option<String>,
    pub completed_at: Option<String>,
}

impl From<&Job> for JobOutput {
    fn from(job: &Job) -> Self {
        let describe = |l: &crate::domain::models::Locator| format!("{}@{} {}", l.url, l.git_ref, l.name);
        Self {
            id: job.id.to_string(),
            state: job.state.as_str().to_string(),
            format: job.request.format.as_str().to_string(),
            test: job.request.test.as_ref().map(describe),
            plan: job.request.plan.as_ref().map(describe),
            result: job.result.clone(),
            created_at: job.created_at.to_rfc3339(),
            started_at: job.started_at.map(|dt| dt.to_rfc3339()),
            completed_at: job.completed_at.map(|dt| dt.to_rfc3339()),
        }
    }
}

#[derive(Debug, serde::Serialize)]
pub struct JobDetailOutput {
    pub job: JobOutput,
}

impl CommandOutput for JobDetailOutput {
    fn to_human(&self) -> String {
        let job = &self.job;
        let mut lines = vec![
            format!("Job: {}", job.id),
            format!("State: {}", job.state),
            format!("Format: {}", job.format),
            format!("Created: {}", job.created_at),
        ];
        if let Some(test) = &job.test {
            lines.push(format!("Test: {test}"));
        }
        if let Some(plan) = &job.plan {
            lines.push(format!("Plan: {plan}"));
        }
        if let Some(started) = &job.started_at {
            lines.push(format!("Started: {started}"));
        }
        if let Some(completed) = &job.completed_at {
            lines.push(format!("Completed: {completed}"));
        }
        match (&job.result, job.state.as_str()) {
            (Some(result), _) => lines.push(format!("Result:\n{result}")),
            (None, "SUCCESS") => lines.push("Result: not found".to_string()),
            _ => {}
        }
        lines.join("\n")
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}

#[derive(Debug, serde::Serialize)]
pub struct JobListOutput {
    pub jobs: Vec<JobOutput>,
    pub total: usize,
}

impl CommandOutput for JobListOutput {
    fn to_human(&self) -> String {
        if self.jobs.is_empty() {
            return "No jobs found.".to_string();
        }

        let mut table = list_table(&["id", "state", "format", "target", "created"]);
        for job in &self.jobs {
            let target = match (&job.test, &job.plan) {
                (Some(test), Some(plan)) => format!("{test} + {plan}"),
                (Some(one), None) | (None, Some(one)) => one.clone(),
                (None, None) => String::new(),
            };
            let state = JobState::from_str(&job.state).unwrap_or_default();
            table.add_row(vec![
                comfy_table::Cell::new(&job.id),
                state_cell(state),
                comfy_table::Cell::new(&job.format),
                comfy_table::Cell::new(truncate(&target, 60)),
                comfy_table::Cell::new(&job.created_at),
            ]);
        }

        format!("{} job(s):\n{table}", self.total)
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}

#[derive(Debug, serde::Serialize)]
pub struct JobActionOutput {
    pub success: bool,
    pub message: String,
}

impl CommandOutput for JobActionOutput {
    fn to_human(&self) -> String {
        self.message.clone()
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}

pub async fn execute(args: JobArgs, config: Config, json_mode: bool) -> Result<()> {
    let repo = open_job_repository(&config.database).await?;
    let runner = JobRunner::new(repo);

    match args.command {
        JobCommands::Status { id } => {
            let id = parse_job_id(&id)?;
            let job = runner
                .status(id)
                .await?
                .ok_or_else(|| anyhow!("Unknown job: {id}"))?;
            output(&JobDetailOutput { job: (&job).into() }, json_mode);
        }
        JobCommands::List { state, limit } => {
            let state = state
                .map(|s| JobState::from_str(&s).ok_or_else(|| anyhow!("Unknown job state: {s}")))
                .transpose()?;
            let jobs = runner
                .list(&JobFilter {
                    state,
                    limit: Some(limit),
                })
                .await?;
            let jobs: Vec<JobOutput> = jobs.iter().map(JobOutput::from).collect();
            let total = jobs.len();
            output(&JobListOutput { jobs, total }, json_mode);
        }
        JobCommands::Revoke { id } => {
            let id = parse_job_id(&id)?;
            let success = runner.revoke(id).await?;
            let message = if success {
                format!("Job {id} revoked")
            } else {
                format!("Job {id} is unknown or already running")
            };
            output(&JobActionOutput { success, message }, json_mode);
        }
        JobCommands::Purge { older_than_secs } => {
            let secs = older_than_secs.unwrap_or(config.retention.result_expires_secs);
            let purged = runner.purge_expired(Duration::from_secs(secs)).await?;
            output(
                &JobActionOutput {
                    success: true,
                    message: format!("Purged {purged} job(s) finished more than {secs}s ago"),
                },
                json_mode,
            );
        }
    }

    Ok(())
}
