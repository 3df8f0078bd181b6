//! Repository fetcher port.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

use crate::domain::errors::FetchError;

/// A local, private checkout of a remote repository.
///
/// When the snapshot owns its directory, dropping it removes the checkout.
#[derive(Debug)]
pub struct Snapshot {
    root: PathBuf,
    _guard: Option<TempDir>,
}

impl Snapshot {
    /// A snapshot that owns (and will remove) its checkout directory.
    pub fn owned(dir: TempDir) -> Self {
        Self {
            root: dir.path().to_path_buf(),
            _guard: Some(dir),
        }
    }

    /// A snapshot borrowed from a directory someone else manages.
    pub fn borrowed(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            _guard: None,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

/// Materializes a repository at a ref.
///
/// A ref equal to [`crate::domain::models::DEFAULT_REF`] means the remote's
/// default branch.
#[async_trait]
pub trait RepositoryFetcher: Send + Sync {
    async fn fetch(&self, url: &str, git_ref: &str) -> Result<Snapshot, FetchError>;
}
