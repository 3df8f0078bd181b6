use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Main configuration structure for tmt-web
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Config {
    /// HTTP server configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// Execution mode and worker pool
    #[serde(default)]
    pub execution: ExecutionConfig,

    /// Job result backend
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Job result retention
    #[serde(default)]
    pub retention: RetentionConfig,

    /// Repository fetcher
    #[serde(default)]
    pub fetcher: FetcherConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ServerConfig {
    /// Socket address to listen on
    #[serde(default = "default_bind_address")]
    pub bind_address: String,

    /// Externally visible base URL used to build callback URLs
    #[serde(default = "default_api_hostname")]
    pub api_hostname: String,
}

fn default_bind_address() -> String {
    "0.0.0.0:8000".to_string()
}

fn default_api_hostname() -> String {
    "http://localhost:8000".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            api_hostname: default_api_hostname(),
        }
    }
}

/// How resolution requests are executed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default, ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionMode {
    /// Resolve inline and answer with the payload
    Synchronous,
    /// Submit a job and answer with a job descriptor or status page
    #[default]
    Queued,
}

impl ExecutionMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Synchronous => "synchronous",
            Self::Queued => "queued",
        }
    }
}

/// Execution configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ExecutionConfig {
    /// Read once at startup
    #[serde(default)]
    pub mode: ExecutionMode,

    /// Maximum number of jobs executing in parallel (1-64)
    #[serde(default = "default_workers")]
    pub workers: usize,

    /// Auto-refresh period of the HTML status page
    #[serde(default = "default_status_refresh_secs")]
    pub status_refresh_secs: u64,
}

const fn default_workers() -> usize {
    4
}

const fn default_status_refresh_secs() -> u64 {
    5
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            mode: ExecutionMode::default(),
            workers: default_workers(),
            status_refresh_secs: default_status_refresh_secs(),
        }
    }
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct DatabaseConfig {
    /// Path to `SQLite` database file
    #[serde(default = "default_database_path")]
    pub path: String,

    /// Maximum number of database connections in pool
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_database_path() -> String {
    ".tmt-web/jobs.db".to_string()
}

const fn default_max_connections() -> u32 {
    5
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_database_path(),
            max_connections: default_max_connections(),
        }
    }
}

/// Retention of finished job records
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct RetentionConfig {
    /// Age after which terminal job records are purged
    #[serde(default = "default_result_expires_secs")]
    pub result_expires_secs: u64,

    /// Interval between purge runs
    #[serde(default = "default_sweep_interval_secs")]
    pub sweep_interval_secs: u64,
}

const fn default_result_expires_secs() -> u64 {
    86_400
}

const fn default_sweep_interval_secs() -> u64 {
    300
}

impl Default for RetentionConfig {
    fn default() -> Self {
        Self {
            result_expires_secs: default_result_expires_secs(),
            sweep_interval_secs: default_sweep_interval_secs(),
        }
    }
}

/// Repository fetcher configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct FetcherConfig {
    /// git executable
    #[serde(default = "default_git_binary")]
    pub git_binary: String,

    /// Base directory for snapshot checkouts (system temp dir if unset)
    #[serde(default)]
    pub clone_root: Option<PathBuf>,
}

fn default_git_binary() -> String {
    "git".to_string()
}

impl Default for FetcherConfig {
    fn default() -> Self {
        Self {
            git_binary: default_git_binary(),
            clone_root: None,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Output format for stdout
    #[serde(default)]
    pub format: LogFormat,

    /// Directory for JSON log files (stdout only if unset)
    #[serde(default)]
    pub log_dir: Option<PathBuf>,

    /// Log file rotation policy
    #[serde(default)]
    pub rotation: RotationPolicy,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Json,
    #[default]
    Pretty,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum RotationPolicy {
    #[default]
    Daily,
    Hourly,
    Never,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
            log_dir: None,
            rotation: RotationPolicy::default(),
        }
    }
}
