//! Domain layer for tmt-web
//!
//! Request, entity and job models, the ports external collaborators plug
//! into, and the error taxonomy shared by the services.

pub mod errors;
pub mod models;
pub mod ports;

pub use errors::{
    DomainError, DomainResult, FetchError, RenderError, ResolutionError, TreeError,
};
