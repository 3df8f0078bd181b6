//! Port trait definitions (Hexagonal Architecture)
//!
//! The resolution core only talks to its collaborators through these traits:
//! - RepositoryFetcher: materializes a repository snapshot at a ref
//! - TreeLoader / ArtifactTree: lists tests and plans in a snapshot
//! - Renderer / StatusPageRenderer: turn resolved entities and jobs into text
//! - JobRepository: the job queue's result backend

pub mod artifact_tree;
pub mod job_repository;
pub mod renderer;
pub mod repository_fetcher;

pub use artifact_tree::{ArtifactTree, StaticTree, TreeLoader};
pub use job_repository::{JobFilter, JobRepository};
pub use renderer::{Renderer, StatusPageRenderer};
pub use repository_fetcher::{RepositoryFetcher, Snapshot};
