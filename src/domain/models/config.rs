use serde::{Deserialize, Serialize};

/// Main configuration structure for engram
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Config {
    /// Workspace used by the command line when none is given
    #[serde(default = "default_workspace")]
    pub default_workspace: String,

    /// Database configuration
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Resolution and history configuration
    #[serde(default)]
    pub resolution: ResolutionConfig,
}

fn default_workspace() -> String {
    "default".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_workspace: default_workspace(),
            database: DatabaseConfig::default(),
            logging: LoggingConfig::default(),
            resolution: ResolutionConfig::default(),
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
    ".engram/engram.db".to_string()
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

impl DatabaseConfig {
    /// `sqlx` connection URL for the configured path.
    pub fn url(&self) -> String {
        format!("sqlite:{}", self.path)
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log format: json or pretty
    #[serde(default = "default_log_format")]
    pub format: String,

    /// Directory for rolling log files; stderr only when unset
    #[serde(default)]
    pub log_dir: Option<String>,

    /// Rotation for file logs: daily, hourly, never
    #[serde(default = "default_rotation")]
    pub rotation: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

fn default_rotation() -> String {
    "daily".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
            log_dir: None,
            rotation: default_rotation(),
        }
    }
}

/// Hard cap on a single history listing.
pub const MAX_HISTORY_LIMIT: u32 = 500;

/// Resolution and history configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ResolutionConfig {
    /// History entries returned when no limit is given
    #[serde(default = "default_history_limit")]
    pub history_default_limit: u32,

    /// Largest history limit a caller may request
    #[serde(default = "default_history_max_limit")]
    pub history_max_limit: u32,

    /// Record each resolution through the background audit queue
    #[serde(default = "default_true")]
    pub audit_enabled: bool,

    /// Bounded audit queue size; records beyond it are dropped
    #[serde(default = "default_audit_capacity")]
    pub audit_queue_capacity: usize,
}

const fn default_history_limit() -> u32 {
    50
}

const fn default_history_max_limit() -> u32 {
    MAX_HISTORY_LIMIT
}

const fn default_true() -> bool {
    true
}

const fn default_audit_capacity() -> usize {
    1024
}

impl Default for ResolutionConfig {
    fn default() -> Self {
        Self {
            history_default_limit: default_history_limit(),
            history_max_limit: default_history_max_limit(),
            audit_enabled: default_true(),
            audit_queue_capacity: default_audit_capacity(),
        }
    }
}
