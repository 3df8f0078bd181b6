//! Infrastructure layer module
//!
//! - Configuration management (figment)
//! - Logging (tracing)
//! - HTTP server (axum)

pub mod config;
pub mod http;
pub mod logging;
