//! Common test utilities for integration tests
//!
//! Fixture fmf trees, stand-in fetchers and a service wired around them.

#![allow(dead_code)]

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

use tmt_web::adapters::fmf::FmfTreeLoader;
use tmt_web::adapters::renderers::RendererRegistry;
use tmt_web::adapters::sqlite::{
    all_embedded_migrations, create_test_pool, Migrator, SqliteJobRepository,
};
use tmt_web::domain::errors::FetchError;
use tmt_web::domain::models::{Config, ExecutionMode};
use tmt_web::domain::ports::{JobRepository, RepositoryFetcher, Snapshot};
use tmt_web::{ResolutionPipeline, ServiceHost};

pub const REPO_URL: &str = "https://example.com/tmt-demo";

/// Write `content` to `relative` below `root`, creating parent directories.
pub fn write(root: &Path, relative: &str, content: &str) {
    let path = root.join(relative);
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(path, content).unwrap();
}

/// A small fmf tree with two tests and two plans.
pub fn fmf_fixture() -> TempDir {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let root = dir.path();
    write(root, ".fmf/version", "1\n");
    write(root, "main.fmf", "contact: Jane Doe <jane@example.com>\n");
    write(
        root,
        "tests/smoke/main.fmf",
        "summary: Smoke test\ntest: ./run.sh\ntag: [core]\ntier: 1\n",
    );
    write(root, "tests/slow.fmf", "summary: Slow test\ntest: ./slow.sh\nduration: 1h\n");
    write(
        root,
        "plans/basic.fmf",
        "summary: Basic plan\ndiscover:\n  how: fmf\nexecute:\n  how: tmt\n",
    );
    write(root, "plans/full.fmf", "summary: Full plan\nexecute:\n  how: tmt\n");
    dir
}

/// Hands out the same local directory for every URL, counting fetches.
///
/// URLs starting with `bad:` fail like an unreachable remote.
pub struct LocalFetcher {
    root: PathBuf,
    fetches: AtomicUsize,
}

impl LocalFetcher {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            fetches: AtomicUsize::new(0),
        }
    }

    pub fn fetches(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RepositoryFetcher for LocalFetcher {
    async fn fetch(&self, url: &str, _git_ref: &str) -> Result<Snapshot, FetchError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        if url.starts_with("bad:") {
            return Err(FetchError::Git {
                operation: "clone",
                url: url.to_string(),
                stderr: "fatal: repository not found".to_string(),
            });
        }
        Ok(Snapshot::borrowed(self.root.clone()))
    }
}

/// Pipeline over the real fmf loader and renderers.
pub fn pipeline(fetcher: Arc<dyn RepositoryFetcher>) -> Arc<ResolutionPipeline> {
    Arc::new(ResolutionPipeline::new(
        fetcher,
        Arc::new(FmfTreeLoader::new()),
        RendererRegistry::with_defaults(5).expect("templates compile"),
    ))
}

/// Fresh in-memory job store with migrations applied.
pub async fn job_repository() -> Arc<SqliteJobRepository> {
    let pool = create_test_pool().await.expect("Failed to create pool");
    Migrator::new(pool.clone())
        .run_embedded_migrations(all_embedded_migrations())
        .await
        .expect("Failed to run migrations");
    Arc::new(SqliteJobRepository::new(pool))
}

pub fn config(mode: ExecutionMode) -> Config {
    let mut config = Config::default();
    config.execution.mode = mode;
    config.execution.workers = 2;
    config.server.api_hostname = "http://tmt.example.com".to_string();
    config
}

/// Service host around a fetcher. Queued mode gets an in-memory job store.
pub async fn service(mode: ExecutionMode, fetcher: Arc<dyn RepositoryFetcher>) -> ServiceHost {
    let repo: Option<Arc<dyn JobRepository>> = match mode {
        ExecutionMode::Synchronous => None,
        ExecutionMode::Queued => Some(job_repository().await),
    };
    ServiceHost::assemble(&config(mode), pipeline(fetcher), repo)
        .await
        .expect("Failed to assemble service")
}

/// Poll `check` every 20ms until it yields a value or `timeout` passes.
pub async fn wait_for<T, F, Fut>(mut check: F, timeout: Duration) -> Option<T>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Option<T>>,
{
    let deadline = tokio::time::Instant::now() + timeout;
    loop {
        if let Some(value) = check().await {
            return Some(value);
        }
        if tokio::time::Instant::now() >= deadline {
            return None;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
}

/// Run git in `dir`, panicking on failure.
pub fn git(dir: &Path, args: &[&str]) -> String {
    let output = Command::new("git")
        .args(["-c", "user.name=Test", "-c", "user.email=test@example.com"])
        .args(["-c", "init.defaultBranch=main", "-c", "commit.gpgsign=false"])
        .args(args)
        .current_dir(dir)
        .output()
        .expect("Failed to run git");
    assert!(
        output.status.success(),
        "git {args:?} failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    String::from_utf8_lossy(&output.stdout).trim().to_string()
}

/// Local git repository holding the fmf fixture on `main`, plus a
/// `feature` branch that adds `/tests/feature`.
pub fn git_fixture() -> TempDir {
    let dir = fmf_fixture();
    let root = dir.path();
    git(root, &["init", "--quiet"]);
    git(root, &["add", "."]);
    git(root, &["commit", "--quiet", "-m", "Add fixture tree"]);
    git(root, &["checkout", "--quiet", "-b", "feature"]);
    write(root, "tests/feature.fmf", "summary: Feature test\ntest: ./feature.sh\n");
    git(root, &["add", "."]);
    git(root, &["commit", "--quiet", "-m", "Add feature test"]);
    git(root, &["checkout", "--quiet", "main"]);
    dir
}
