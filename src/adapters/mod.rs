//! Adapters implementing the domain ports.

pub mod fmf;
pub mod git;
pub mod renderers;
pub mod sqlite;
