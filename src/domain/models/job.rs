//! Job domain model.
//!
//! A job wraps one queued resolution request. Its state is owned by the
//! worker side; readers only ever observe it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use super::request::ResolutionRequest;

/// Opaque job identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(Uuid);

impl JobId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for JobId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

impl From<Uuid> for JobId {
    fn from(id: Uuid) -> Self {
        Self(id)
    }
}

/// Lifecycle state of a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum JobState {
    /// Accepted by the queue, not yet picked up by a worker
    #[default]
    Pending,
    /// A worker is executing the resolution
    Started,
    /// Resolution finished; result holds the payload (null means not found)
    Success,
    /// Resolution raised an error; result holds the diagnostic
    Failure,
    /// Queued again after its worker went away
    Retry,
    /// Cancelled by queue administration
    Revoked,
}

impl JobState {
    pub const ALL: [JobState; 6] = [
        Self::Pending,
        Self::Started,
        Self::Success,
        Self::Failure,
        Self::Retry,
        Self::Revoked,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Started => "STARTED",
            Self::Success => "SUCCESS",
            Self::Failure => "FAILURE",
            Self::Retry => "RETRY",
            Self::Revoked => "REVOKED",
        }
    }

    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "PENDING" => Some(Self::Pending),
            "STARTED" => Some(Self::Started),
            "SUCCESS" => Some(Self::Success),
            "FAILURE" => Some(Self::Failure),
            "RETRY" => Some(Self::Retry),
            "REVOKED" => Some(Self::Revoked),
            _ => None,
        }
    }

    /// Terminal states never change again (until the record expires).
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Success | Self::Failure | Self::Revoked)
    }

    /// Valid transitions from this state.
    pub fn valid_transitions(&self) -> &'static [JobState] {
        match self {
            Self::Pending | Self::Retry => &[Self::Started, Self::Revoked],
            Self::Started => &[Self::Success, Self::Failure, Self::Retry],
            Self::Success | Self::Failure | Self::Revoked => &[],
        }
    }

    pub fn can_transition_to(&self, new_state: Self) -> bool {
        self.valid_transitions().contains(&new_state)
    }

    /// Every state a job may enter `target` from.
    pub fn sources_of(target: Self) -> Vec<JobState> {
        Self::ALL
            .into_iter()
            .filter(|state| state.can_transition_to(target))
            .collect()
    }

    pub fn terminal_states() -> Vec<JobState> {
        Self::ALL.into_iter().filter(Self::is_terminal).collect()
    }
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A unit of asynchronous work wrapping one resolution request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    pub id: JobId,
    pub state: JobState,
    pub request: ResolutionRequest,
    /// Payload on SUCCESS (None = entity not found), diagnostic on FAILURE,
    /// None otherwise.
    pub result: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl Job {
    /// Create a new PENDING job for the request.
    pub fn new(request: ResolutionRequest) -> Self {
        let now = Utc::now();
        Self {
            id: JobId::new(),
            state: JobState::Pending,
            request,
            result: None,
            created_at: now,
            updated_at: now,
            started_at: None,
            completed_at: None,
        }
    }

    /// True when the job succeeded but the requested entity was absent.
    pub fn is_not_found(&self) -> bool {
        self.state == JobState::Success && self.result.is_none()
    }
}

/// Outward shape of a job as returned by the status endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobDescriptor {
    pub id: String,
    pub status: String,
    pub result: Option<String>,
    pub status_callback_url: String,
}

impl JobDescriptor {
    pub fn from_job(job: &Job, status_callback_url: String) -> Self {
        Self {
            id: job.id.to_string(),
            status: job.state.as_str().to_string(),
            result: job.result.clone(),
            status_callback_url,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::request::{Locator, OutputFormat};

    #[test]
    fn test_state_round_trips_through_str() {
        for state in JobState::ALL {
            assert_eq!(JobState::from_str(state.as_str()), Some(state));
        }
        assert_eq!(JobState::from_str("success"), Some(JobState::Success));
        assert_eq!(JobState::from_str("done"), None);
    }

    #[test]
    fn test_state_serializes_uppercase() {
        assert_eq!(serde_json::to_value(JobState::Started).unwrap(), "STARTED");
    }

    #[test]
    fn test_transitions() {
        assert!(JobState::Pending.can_transition_to(JobState::Started));
        assert!(JobState::Retry.can_transition_to(JobState::Started));
        assert!(JobState::Started.can_transition_to(JobState::Success));
        assert!(JobState::Started.can_transition_to(JobState::Failure));
        assert!(!JobState::Pending.can_transition_to(JobState::Success));
        assert!(!JobState::Success.can_transition_to(JobState::Started));
        assert!(JobState::Revoked.valid_transitions().is_empty());
    }

    #[test]
    fn test_sources_of() {
        assert_eq!(
            JobState::sources_of(JobState::Started),
            vec![JobState::Pending, JobState::Retry]
        );
        assert_eq!(
            JobState::sources_of(JobState::Revoked),
            vec![JobState::Pending, JobState::Retry]
        );
        assert_eq!(JobState::sources_of(JobState::Retry), vec![JobState::Started]);
        assert_eq!(JobState::sources_of(JobState::Success), vec![JobState::Started]);
        assert!(JobState::sources_of(JobState::Pending).is_empty());
        assert_eq!(
            JobState::terminal_states(),
            vec![JobState::Success, JobState::Failure, JobState::Revoked]
        );
    }

    #[test]
    fn test_new_job_is_pending() {
        let job = Job::new(ResolutionRequest::for_test(
            Locator::new("u", "/t"),
            OutputFormat::Json,
        ));
        assert_eq!(job.state, JobState::Pending);
        assert!(job.result.is_none());
        assert!(!job.is_not_found());
    }

    #[test]
    fn test_job_id_parse() {
        let id = JobId::new();
        assert_eq!(id.to_string().parse::<JobId>().unwrap(), id);
        assert!("not-a-uuid".parse::<JobId>().is_err());
    }

    #[test]
    fn test_descriptor_shape() {
        let job = Job::new(ResolutionRequest::for_test(
            Locator::new("u", "/t"),
            OutputFormat::Json,
        ));
        let descriptor =
            JobDescriptor::from_job(&job, format!("http://host/status?task-id={}", job.id));
        let value = serde_json::to_value(&descriptor).unwrap();
        assert_eq!(value["status"], "PENDING");
        assert!(value["result"].is_null());
        assert_eq!(value["id"], job.id.to_string());
    }
}
