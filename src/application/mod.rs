//! Application layer: wires configuration into running services.

pub mod service_host;

pub use service_host::{build_pipeline, open_job_repository, ServiceHost};
