//! Domain models for tmt-web.

pub mod config;
pub mod entity;
pub mod job;
pub mod request;

pub use config::{
    Config, DatabaseConfig, ExecutionConfig, ExecutionMode, FetcherConfig, LogFormat,
    LoggingConfig, RetentionConfig, RotationPolicy, ServerConfig,
};
pub use entity::{find_first, Entity, EntityKind, ResolvedEntity};
pub use job::{Job, JobDescriptor, JobId, JobState};
pub use request::{
    Locator, OutputFormat, RequestError, RequestParams, ResolutionRequest, Target, UnknownFormat,
    DEFAULT_REF,
};
