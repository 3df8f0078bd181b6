//! Fetches repository snapshots with the git CLI.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;
use tracing::{debug, error, info, instrument};

use crate::domain::errors::FetchError;
use crate::domain::models::{FetcherConfig, DEFAULT_REF};
use crate::domain::ports::{RepositoryFetcher, Snapshot};

/// Clones each requested repository into its own temporary directory.
///
/// Snapshots are never shared or reused: every call clones afresh and the
/// checkout is removed when the returned [`Snapshot`] is dropped.
#[derive(Debug, Clone)]
pub struct GitRepositoryFetcher {
    git_binary: String,
    clone_root: Option<PathBuf>,
}

impl GitRepositoryFetcher {
    pub fn new(config: &FetcherConfig) -> Self {
        Self {
            git_binary: config.git_binary.clone(),
            clone_root: config.clone_root.clone(),
        }
    }

    fn workspace(&self) -> Result<tempfile::TempDir, FetchError> {
        let builder = {
            let mut b = tempfile::Builder::new();
            b.prefix("tmt-web-");
            b
        };
        match &self.clone_root {
            Some(root) => {
                std::fs::create_dir_all(root).map_err(FetchError::Workspace)?;
                builder.tempdir_in(root)
            }
            None => builder.tempdir(),
        }
        .map_err(FetchError::Workspace)
    }

    async fn run_git(
        &self,
        operation: &'static str,
        url: &str,
        args: &[&str],
        cwd: Option<&Path>,
    ) -> Result<(), FetchError> {
        let mut command = Command::new(&self.git_binary);
        command
            .args(args)
            .env("GIT_TERMINAL_PROMPT", "0")
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        if let Some(dir) = cwd {
            command.current_dir(dir);
        }

        let output = command.output().await.map_err(|source| FetchError::Spawn {
            binary: self.git_binary.clone(),
            source,
        })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            error!(url = %url, operation, stderr = %stderr, "git command failed");
            return Err(FetchError::Git {
                operation,
                url: url.to_string(),
                stderr,
            });
        }

        Ok(())
    }
}

impl Default for GitRepositoryFetcher {
    fn default() -> Self {
        Self::new(&FetcherConfig::default())
    }
}

#[async_trait]
impl RepositoryFetcher for GitRepositoryFetcher {
    #[instrument(skip(self), err)]
    async fn fetch(&self, url: &str, git_ref: &str) -> Result<Snapshot, FetchError> {
        // Refs are passed as a positional argument, so they must not look like options
        if git_ref.starts_with('-') {
            return Err(FetchError::Git {
                operation: "checkout",
                url: url.to_string(),
                stderr: format!("invalid ref '{git_ref}'"),
            });
        }

        let dir = self.workspace()?;
        let target = dir.path().to_string_lossy().to_string();

        info!(url = %url, git_ref = %git_ref, "Cloning the repository");
        self.run_git("clone", url, &["clone", "--quiet", "--", url, &target], None)
            .await?;

        if git_ref == DEFAULT_REF {
            debug!(url = %url, "Using the default branch");
        } else {
            debug!(url = %url, git_ref = %git_ref, "Checking out ref");
            self.run_git("checkout", url, &["checkout", "--quiet", git_ref], Some(dir.path()))
                .await?;
        }

        Ok(Snapshot::owned(dir))
    }
}
