//! HTTP surface of the service.

pub mod server;

pub use server::{router, HttpServer};
