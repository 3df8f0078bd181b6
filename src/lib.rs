//! tmt-web - resolve tmt tests and plans from git repositories
//!
//! Given a repository URL, a ref and the name of a test and/or plan, the
//! service clones the repository, walks its fmf metadata tree, picks the
//! matching entity and renders it as HTML, JSON or YAML. Requests are
//! answered inline or submitted as jobs that callers poll by id.
//!
//! # Architecture
//!
//! - **Domain Layer** (`domain`): request, entity and job models plus ports
//! - **Adapters** (`adapters`): git fetcher, fmf tree loader, renderers, SQLite job store
//! - **Service Layer** (`services`): resolution pipeline, job runner, request gateway
//! - **Application Layer** (`application`): wiring configuration into a running service
//! - **Infrastructure Layer** (`infrastructure`): configuration, logging, HTTP
//! - **CLI Layer** (`cli`): command-line interface

pub mod adapters;
pub mod application;
pub mod cli;
pub mod domain;
pub mod infrastructure;
pub mod services;

pub use application::ServiceHost;
pub use domain::models::{
    Config, ExecutionMode, Job, JobId, JobState, Locator, OutputFormat, RequestParams,
    ResolutionRequest,
};
pub use infrastructure::config::{ConfigError, ConfigLoader};
pub use services::{RequestGateway, ResolutionPipeline};
