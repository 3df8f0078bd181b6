//! Artifact tree port.

use std::path::Path;

use crate::domain::errors::TreeError;
use crate::domain::models::Entity;

/// Read-only view of the tests and plans in a snapshot.
pub trait ArtifactTree: Send + Sync {
    /// Tests in the tree's native order.
    fn tests(&self) -> &[Entity];

    /// Plans in the tree's native order.
    fn plans(&self) -> &[Entity];
}

/// Builds an [`ArtifactTree`] from a snapshot directory.
///
/// Loading is filesystem-bound and synchronous; callers run it on a
/// blocking thread.
pub trait TreeLoader: Send + Sync {
    /// `path` is the optional tree location relative to `root`.
    fn load(&self, root: &Path, path: Option<&str>) -> Result<Box<dyn ArtifactTree>, TreeError>;
}

/// An in-memory tree holding pre-built entity lists.
#[derive(Debug, Clone, Default)]
pub struct StaticTree {
    tests: Vec<Entity>,
    plans: Vec<Entity>,
}

impl StaticTree {
    pub fn new(tests: Vec<Entity>, plans: Vec<Entity>) -> Self {
        Self { tests, plans }
    }
}

impl ArtifactTree for StaticTree {
    fn tests(&self) -> &[Entity] {
        &self.tests
    }

    fn plans(&self) -> &[Entity] {
        &self.plans
    }
}
