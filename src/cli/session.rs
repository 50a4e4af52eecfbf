//! Shared setup for commands that touch the store.

use anyhow::{bail, Context, Result};
use sqlx::SqlitePool;
use std::path::Path;
use std::sync::Arc;
use tokio::task::JoinHandle;

use crate::adapters::sqlite::{
    initialize_database, PoolConfig, SqliteMetricCatalog, SqliteOverlayRepository, SqliteResolutionLogRepository,
    SqliteSemanticEventRepository,
};
use crate::domain::models::Config;
use crate::services::{ResolutionAudit, ResolutionAuditHandle};

/// Loaded configuration, an open pool and the workspace commands operate in.
pub struct Session {
    pub config: Config,
    pub workspace_id: String,
    pub pool: SqlitePool,
}

impl Session {
    /// Open the configured database. `workspace` overrides the configured default.
    pub async fn open(config: Config, workspace: Option<String>) -> Result<Self> {
        let path = &config.database.path;
        if path != ":memory:" && !Path::new(path).exists() {
            bail!("Database not found at {path}. Run 'engram init' first.");
        }

        let pool = initialize_database(&config.database.url(), Some(PoolConfig::from(&config.database)))
            .await
            .context("Failed to initialize database. Run 'engram init' first.")?;

        let workspace_id = workspace
            .filter(|ws| !ws.trim().is_empty())
            .unwrap_or_else(|| config.default_workspace.clone());

        Ok(Self { config, workspace_id, pool })
    }

    pub fn catalog(&self) -> Arc<SqliteMetricCatalog> {
        Arc::new(SqliteMetricCatalog::new(self.pool.clone()))
    }

    pub fn events(&self) -> Arc<SqliteSemanticEventRepository> {
        Arc::new(SqliteSemanticEventRepository::new(self.pool.clone()))
    }

    pub fn overlays(&self) -> Arc<SqliteOverlayRepository> {
        Arc::new(SqliteOverlayRepository::new(self.pool.clone()))
    }

    pub fn resolution_log(&self) -> Arc<SqliteResolutionLogRepository> {
        Arc::new(SqliteResolutionLogRepository::new(self.pool.clone()))
    }

    /// Start the audit writer when auditing is enabled.
    pub fn start_audit(&self) -> Option<(ResolutionAuditHandle, JoinHandle<u64>)> {
        let settings = &self.config.resolution;
        settings
            .audit_enabled
            .then(|| ResolutionAudit::spawn(self.resolution_log(), settings.audit_queue_capacity))
    }
}

/// Wait for the audit writer to drain. Every handle must already be dropped.
pub async fn finish_audit(worker: Option<JoinHandle<u64>>) {
    if let Some(worker) = worker {
        match worker.await {
            Ok(persisted) => tracing::debug!(persisted, "resolution audit flushed"),
            Err(e) => tracing::warn!(error = %e, "resolution audit worker failed"),
        }
    }
}
