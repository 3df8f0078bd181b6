use anyhow::{Context, Result};
use figment::providers::{Env, Format, Serialized, Yaml};
use figment::Figment;
use std::net::SocketAddr;
use std::path::Path;
use thiserror::Error;

use crate::domain::models::config::Config;

/// Project config file, looked up in the working directory.
pub const CONFIG_FILE: &str = "tmt-web.yaml";
/// Optional developer overrides on top of [`CONFIG_FILE`].
pub const LOCAL_CONFIG_FILE: &str = "tmt-web.local.yaml";
/// Prefix of environment overrides, e.g. `TMT_WEB_EXECUTION__MODE`.
pub const ENV_PREFIX: &str = "TMT_WEB_";

const MAX_WORKERS: usize = 64;
/// Upper bound for retention settings: 100 years.
pub const MAX_RETENTION_SECS: u64 = 100 * 365 * 86_400;

/// Configuration error types
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid workers: {0}. Must be between 1 and {MAX_WORKERS}")]
    InvalidWorkers(usize),

    #[error("Invalid bind address: {0}")]
    InvalidBindAddress(String),

    #[error("Invalid api_hostname: {0}. Must be an http:// or https:// URL")]
    InvalidApiHostname(String),

    #[error("Invalid log level: {0}. Must be one of: trace, debug, info, warn, error")]
    InvalidLogLevel(String),

    #[error("Database path cannot be empty")]
    EmptyDatabasePath,

    #[error("Invalid max_connections: {0}. Must be at least 1")]
    InvalidMaxConnections(u32),

    #[error("Invalid retention setting {0}: must be between 1 and {MAX_RETENTION_SECS} seconds")]
    InvalidRetention(&'static str),

    #[error("git_binary cannot be empty")]
    EmptyGitBinary,
}

/// Configuration loader with hierarchical merging
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration with hierarchical merging
    ///
    /// Precedence (lowest to highest):
    /// 1. Programmatic defaults (Serialized)
    /// 2. tmt-web.yaml
    /// 3. tmt-web.local.yaml (optional overrides)
    /// 4. Environment variables (TMT_WEB_* prefix, `__` for nesting)
    pub fn load() -> Result<Config> {
        let figment = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Yaml::file(CONFIG_FILE))
            .merge(Yaml::file(LOCAL_CONFIG_FILE))
            .merge(Env::prefixed(ENV_PREFIX).split("__"));

        Self::finish(figment).context("Failed to extract configuration from figment")
    }

    /// Load configuration from a specific file. Environment overrides
    /// still apply on top of it.
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Config> {
        let path = path.as_ref();
        if !path.is_file() {
            anyhow::bail!("Config file not found: {}", path.display());
        }

        let figment = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Yaml::file(path))
            .merge(Env::prefixed(ENV_PREFIX).split("__"));

        Self::finish(figment).context(format!("Failed to load config from {}", path.display()))
    }

    fn finish(figment: Figment) -> Result<Config> {
        let mut config: Config = figment.extract()?;
        config.server.api_hostname = config.server.api_hostname.trim_end_matches('/').to_string();
        Self::validate(&config)?;
        Ok(config)
    }

    /// Validate configuration after loading
    pub fn validate(config: &Config) -> Result<(), ConfigError> {
        if config.server.bind_address.parse::<SocketAddr>().is_err() {
            return Err(ConfigError::InvalidBindAddress(
                config.server.bind_address.clone(),
            ));
        }

        let host = &config.server.api_hostname;
        if !(host.starts_with("http://") || host.starts_with("https://")) {
            return Err(ConfigError::InvalidApiHostname(host.clone()));
        }

        if config.execution.workers == 0 || config.execution.workers > MAX_WORKERS {
            return Err(ConfigError::InvalidWorkers(config.execution.workers));
        }

        if config.database.path.is_empty() {
            return Err(ConfigError::EmptyDatabasePath);
        }

        if config.database.max_connections == 0 {
            return Err(ConfigError::InvalidMaxConnections(
                config.database.max_connections,
            ));
        }

        let retention = [
            ("result_expires_secs", config.retention.result_expires_secs),
            ("sweep_interval_secs", config.retention.sweep_interval_secs),
        ];
        for (name, secs) in retention {
            if secs == 0 || secs > MAX_RETENTION_SECS {
                return Err(ConfigError::InvalidRetention(name));
            }
        }

        if config.fetcher.git_binary.is_empty() {
            return Err(ConfigError::EmptyGitBinary);
        }

        let valid_log_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_log_levels.contains(&config.logging.level.as_str()) {
            return Err(ConfigError::InvalidLogLevel(config.logging.level.clone()));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::config::{ExecutionMode, LogFormat};
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn yaml_file(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "{content}").unwrap();
        file.flush().unwrap();
        file
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.execution.mode, ExecutionMode::Queued);
        assert_eq!(config.execution.workers, 4);
        assert_eq!(config.database.path, ".tmt-web/jobs.db");
        assert_eq!(config.server.api_hostname, "http://localhost:8000");
        assert_eq!(config.logging.format, LogFormat::Pretty);
        ConfigLoader::validate(&config).expect("Default config should be valid");
    }

    #[test]
    fn test_load_from_file() {
        let file = yaml_file(
            "server:\n  api_hostname: https://tmt.example.com/\nexecution:\n  mode: synchronous\n  workers: 8\nlogging:\n  level: debug\n  format: json\n",
        );

        let config = temp_env::with_vars_unset(
            ["TMT_WEB_EXECUTION__MODE", "TMT_WEB_SERVER__API_HOSTNAME"],
            || ConfigLoader::load_from_file(file.path()).unwrap(),
        );

        assert_eq!(config.execution.mode, ExecutionMode::Synchronous);
        assert_eq!(config.execution.workers, 8);
        assert_eq!(config.server.api_hostname, "https://tmt.example.com");
        assert_eq!(config.logging.format, LogFormat::Json);
        assert_eq!(config.database.max_connections, 5, "Defaults fill the rest");
    }

    #[test]
    fn test_env_overrides_file() {
        let file = yaml_file("execution:\n  mode: synchronous\n  workers: 2\n");

        let config = temp_env::with_vars(
            [
                ("TMT_WEB_EXECUTION__MODE", Some("queued")),
                ("TMT_WEB_DATABASE__PATH", Some("/var/lib/tmt-web/jobs.db")),
            ],
            || ConfigLoader::load_from_file(file.path()).unwrap(),
        );

        assert_eq!(config.execution.mode, ExecutionMode::Queued);
        assert_eq!(config.execution.workers, 2);
        assert_eq!(config.database.path, "/var/lib/tmt-web/jobs.db");
    }

    #[test]
    fn test_unknown_mode_rejected() {
        let file = yaml_file("execution:\n  mode: celery\n");
        let result = temp_env::with_var_unset("TMT_WEB_EXECUTION__MODE", || {
            ConfigLoader::load_from_file(file.path())
        });
        assert!(result.is_err());
    }

    #[test]
    fn test_missing_file_is_error() {
        assert!(ConfigLoader::load_from_file("/nonexistent/tmt-web.yaml").is_err());
    }

    #[test]
    fn test_validate_workers_range() {
        for workers in [0, MAX_WORKERS + 1] {
            let mut config = Config::default();
            config.execution.workers = workers;
            assert!(matches!(
                ConfigLoader::validate(&config),
                Err(ConfigError::InvalidWorkers(w)) if w == workers
            ));
        }
    }

    #[test]
    fn test_validate_bind_and_host() {
        let mut config = Config::default();
        config.server.bind_address = "localhost".to_string();
        assert!(matches!(
            ConfigLoader::validate(&config),
            Err(ConfigError::InvalidBindAddress(_))
        ));

        let mut config = Config::default();
        config.server.api_hostname = "tmt.example.com".to_string();
        assert!(matches!(
            ConfigLoader::validate(&config),
            Err(ConfigError::InvalidApiHostname(_))
        ));
    }

    #[test]
    fn test_validate_invalid_log_level() {
        let mut config = Config::default();
        config.logging.level = "verbose".to_string();

        match ConfigLoader::validate(&config).unwrap_err() {
            ConfigError::InvalidLogLevel(level) => assert_eq!(level, "verbose"),
            other => panic!("Expected InvalidLogLevel error, got {other:?}"),
        }
    }

    #[test]
    fn test_validate_database_and_retention() {
        let mut config = Config::default();
        config.database.path = String::new();
        assert!(matches!(
            ConfigLoader::validate(&config),
            Err(ConfigError::EmptyDatabasePath)
        ));

        let mut config = Config::default();
        config.database.max_connections = 0;
        assert!(matches!(
            ConfigLoader::validate(&config),
            Err(ConfigError::InvalidMaxConnections(0))
        ));

        let mut config = Config::default();
        config.retention.sweep_interval_secs = 0;
        assert!(matches!(
            ConfigLoader::validate(&config),
            Err(ConfigError::InvalidRetention("sweep_interval_secs"))
        ));
    }

    #[test]
    fn test_validate_retention_upper_bound() {
        let mut config = Config::default();
        config.retention.result_expires_secs = MAX_RETENTION_SECS;
        ConfigLoader::validate(&config).expect("The bound itself is accepted");

        config.retention.result_expires_secs = MAX_RETENTION_SECS + 1;
        assert!(matches!(
            ConfigLoader::validate(&config),
            Err(ConfigError::InvalidRetention("result_expires_secs"))
        ));

        let mut config = Config::default();
        config.retention.result_expires_secs = u64::MAX;
        assert!(ConfigLoader::validate(&config).is_err());
    }
}
