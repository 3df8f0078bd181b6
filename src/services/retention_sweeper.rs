//! Background purge of expired job results.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use crate::domain::errors::DomainResult;
use crate::domain::models::RetentionConfig;
use crate::services::job_runner::JobRunner;

/// Configuration for the retention sweeper.
#[derive(Debug, Clone)]
pub struct SweeperConfig {
    /// Interval between purge runs.
    pub sweep_interval: Duration,
    /// Terminal jobs older than this are deleted.
    pub result_expires: Duration,
}

impl From<&RetentionConfig> for SweeperConfig {
    fn from(config: &RetentionConfig) -> Self {
        Self {
            sweep_interval: Duration::from_secs(config.sweep_interval_secs.max(1)),
            result_expires: Duration::from_secs(config.result_expires_secs),
        }
    }
}

/// Handle to stop a running sweeper.
#[derive(Debug, Clone)]
pub struct SweeperHandle {
    stop_flag: Arc<AtomicBool>,
    wake: Arc<Notify>,
}

impl SweeperHandle {
    /// Request the sweeper to stop. It exits before its next run.
    pub fn stop(&self) {
        self.stop_flag.store(true, Ordering::Release);
        self.wake.notify_one();
    }

    pub fn is_stop_requested(&self) -> bool {
        self.stop_flag.load(Ordering::Acquire)
    }
}

/// Periodically deletes SUCCESS, FAILURE and REVOKED jobs past retention.
#[derive(Debug)]
pub struct RetentionSweeper {
    runner: JobRunner,
    config: SweeperConfig,
    stop_flag: Arc<AtomicBool>,
    wake: Arc<Notify>,
}

impl RetentionSweeper {
    pub fn new(runner: JobRunner, config: SweeperConfig) -> Self {
        Self {
            runner,
            config,
            stop_flag: Arc::new(AtomicBool::new(false)),
            wake: Arc::new(Notify::new()),
        }
    }

    pub fn handle(&self) -> SweeperHandle {
        SweeperHandle {
            stop_flag: Arc::clone(&self.stop_flag),
            wake: Arc::clone(&self.wake),
        }
    }

    /// Run one purge pass.
    pub async fn sweep_once(&self) -> DomainResult<u64> {
        let purged = self.runner.purge_expired(self.config.result_expires).await?;
        if purged > 0 {
            info!(purged, "Purged expired jobs");
        } else {
            debug!("No expired jobs");
        }
        Ok(purged)
    }

    /// Spawn the sweep loop. The first pass runs immediately.
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(self.run_loop())
    }

    async fn run_loop(self) {
        let mut timer = interval(self.config.sweep_interval);
        timer.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut consecutive_failures = 0u32;

        info!(
            interval_secs = self.config.sweep_interval.as_secs(),
            expires_secs = self.config.result_expires.as_secs(),
            "Retention sweeper started"
        );

        loop {
            tokio::select! {
                _ = timer.tick() => {}
                () = self.wake.notified() => {}
            }

            if self.stop_flag.load(Ordering::Acquire) {
                break;
            }

            match self.sweep_once().await {
                Ok(_) => consecutive_failures = 0,
                Err(e) => {
                    consecutive_failures += 1;
                    if consecutive_failures > 1 {
                        error!(error = %e, consecutive_failures, "Retention sweep keeps failing");
                    } else {
                        warn!(error = %e, "Retention sweep failed");
                    }
                }
            }
        }

        info!("Retention sweeper stopped");
    }
}
