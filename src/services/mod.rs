//! Service layer: resolution, the job queue and request handling.

pub mod job_runner;
pub mod request_gateway;
pub mod resolution_pipeline;
pub mod retention_sweeper;

pub use job_runner::{JobRunner, WorkerPool};
pub use request_gateway::{GatewayError, GatewayResponse, GatewaySettings, RequestGateway};
pub use resolution_pipeline::{Resolution, ResolutionPipeline};
pub use retention_sweeper::{RetentionSweeper, SweeperConfig, SweeperHandle};
