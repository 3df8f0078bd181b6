//! Domain errors for tmt-web.

use std::path::PathBuf;
use thiserror::Error;

use super::models::{JobId, JobState, OutputFormat};

/// Errors raised by the job queue and its result backend.
#[derive(Debug, Error)]
pub enum DomainError {
    #[error("Invalid state transition for job {id} from {from} to {to}")]
    InvalidStateTransition {
        id: JobId,
        from: JobState,
        to: JobState,
    },

    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Invalid retention age: {0}")]
    InvalidAge(String),

    #[error("Job queue is not accepting work: {0}")]
    QueueUnavailable(String),
}

pub type DomainResult<T> = Result<T, DomainError>;

impl From<sqlx::Error> for DomainError {
    fn from(err: sqlx::Error) -> Self {
        DomainError::DatabaseError(err.to_string())
    }
}

impl From<serde_json::Error> for DomainError {
    fn from(err: serde_json::Error) -> Self {
        DomainError::SerializationError(err.to_string())
    }
}

/// The remote repository could not be materialized locally.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Failed to run {binary}: {source}")]
    Spawn {
        binary: String,
        #[source]
        source: std::io::Error,
    },

    #[error("git {operation} failed for {url}: {stderr}")]
    Git {
        operation: &'static str,
        url: String,
        stderr: String,
    },

    #[error("Failed to prepare checkout directory: {0}")]
    Workspace(#[source] std::io::Error),
}

/// The fetched snapshot could not be read as a metadata tree.
#[derive(Debug, Error)]
pub enum TreeError {
    #[error("No metadata tree found at {0} (missing .fmf directory)")]
    NotATree(PathBuf),

    #[error("Invalid tree path '{0}'")]
    InvalidPath(String),

    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse {path}: {message}")]
    Parse { path: PathBuf, message: String },
}

/// A renderer could not produce the requested output.
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("No renderer registered for format '{0}'")]
    Unsupported(OutputFormat),

    #[error("Template error: {0}")]
    Template(String),

    #[error("Serialization error: {0}")]
    Serialize(String),
}

impl From<serde_json::Error> for RenderError {
    fn from(err: serde_json::Error) -> Self {
        RenderError::Serialize(err.to_string())
    }
}

impl From<serde_yaml::Error> for RenderError {
    fn from(err: serde_yaml::Error) -> Self {
        RenderError::Serialize(err.to_string())
    }
}

impl From<handlebars::RenderError> for RenderError {
    fn from(err: handlebars::RenderError) -> Self {
        RenderError::Template(err.to_string())
    }
}

/// Any failure of the resolution pipeline.
#[derive(Debug, Error)]
pub enum ResolutionError {
    #[error("Fetch failed: {0}")]
    Fetch(#[from] FetchError),

    #[error("Tree error: {0}")]
    Tree(#[from] TreeError),

    #[error("Render failed: {0}")]
    Render(#[from] RenderError),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<tokio::task::JoinError> for ResolutionError {
    fn from(err: tokio::task::JoinError) -> Self {
        ResolutionError::Internal(err.to_string())
    }
}
