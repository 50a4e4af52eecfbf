use anyhow::{Context, Result};
use figment::providers::{Env, Format, Serialized, Yaml};
use figment::Figment;
use std::path::Path;
use thiserror::Error;

use crate::domain::models::config::{Config, MAX_HISTORY_LIMIT};

/// Project directory holding config files and the default database.
pub const CONFIG_DIR: &str = ".engram";

/// Prefix for environment overrides; `__` separates nested keys.
pub const ENV_PREFIX: &str = "ENGRAM_";

/// Configuration error types
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("default_workspace cannot be empty")]
    EmptyWorkspace,

    #[error("Database path cannot be empty")]
    EmptyDatabasePath,

    #[error("Invalid max_connections: {0}. Must be at least 1")]
    InvalidMaxConnections(u32),

    #[error("Invalid log level: {0}. Must be one of: trace, debug, info, warn, error")]
    InvalidLogLevel(String),

    #[error("Invalid log format: {0}. Must be one of: json, pretty")]
    InvalidLogFormat(String),

    #[error("Invalid log rotation: {0}. Must be one of: daily, hourly, never")]
    InvalidLogRotation(String),

    #[error("Invalid history_max_limit: {0}. Must be between 1 and {MAX_HISTORY_LIMIT}")]
    InvalidHistoryMaxLimit(u32),

    #[error("Invalid history_default_limit: {default}. Must be between 1 and {max}")]
    InvalidHistoryDefaultLimit { default: u32, max: u32 },

    #[error("Invalid audit_queue_capacity: {0}. Must be at least 1")]
    InvalidAuditCapacity(usize),
}

/// Configuration loader with hierarchical merging
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration for the current directory.
    ///
    /// Precedence (lowest to highest):
    /// 1. Programmatic defaults (Serialized)
    /// 2. .engram/config.yaml (project config, created by init)
    /// 3. .engram/local.yaml (project local overrides, optional)
    /// 4. Environment variables (ENGRAM_* prefix, highest priority)
    pub fn load() -> Result<Config> {
        Self::load_from_dir(".")
    }

    /// Same as [`Self::load`] with the project rooted at `root`.
    pub fn load_from_dir(root: impl AsRef<Path>) -> Result<Config> {
        let dir = root.as_ref().join(CONFIG_DIR);
        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Yaml::file(dir.join("config.yaml")))
            .merge(Yaml::file(dir.join("local.yaml")))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .extract()
            .context("Failed to extract configuration from figment")?;

        Self::validate(&config)?;
        Ok(config)
    }

    /// Load configuration from a specific file, without environment overrides.
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Config> {
        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Yaml::file(path.as_ref()))
            .extract()
            .with_context(|| format!("Failed to load config from {}", path.as_ref().display()))?;

        Self::validate(&config)?;
        Ok(config)
    }

    /// Validate configuration after loading
    pub fn validate(config: &Config) -> Result<(), ConfigError> {
        if config.default_workspace.trim().is_empty() {
            return Err(ConfigError::EmptyWorkspace);
        }

        if config.database.path.is_empty() {
            return Err(ConfigError::EmptyDatabasePath);
        }
        if config.database.max_connections == 0 {
            return Err(ConfigError::InvalidMaxConnections(config.database.max_connections));
        }

        let valid_log_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_log_levels.contains(&config.logging.level.as_str()) {
            return Err(ConfigError::InvalidLogLevel(config.logging.level.clone()));
        }
        let valid_log_formats = ["json", "pretty"];
        if !valid_log_formats.contains(&config.logging.format.as_str()) {
            return Err(ConfigError::InvalidLogFormat(config.logging.format.clone()));
        }
        let valid_rotations = ["daily", "hourly", "never"];
        if !valid_rotations.contains(&config.logging.rotation.as_str()) {
            return Err(ConfigError::InvalidLogRotation(config.logging.rotation.clone()));
        }

        let resolution = &config.resolution;
        if resolution.history_max_limit == 0 || resolution.history_max_limit > MAX_HISTORY_LIMIT {
            return Err(ConfigError::InvalidHistoryMaxLimit(resolution.history_max_limit));
        }
        if resolution.history_default_limit == 0 || resolution.history_default_limit > resolution.history_max_limit {
            return Err(ConfigError::InvalidHistoryDefaultLimit {
                default: resolution.history_default_limit,
                max: resolution.history_max_limit,
            });
        }
        if resolution.audit_queue_capacity == 0 {
            return Err(ConfigError::InvalidAuditCapacity(resolution.audit_queue_capacity));
        }

        Ok(())
    }
}
