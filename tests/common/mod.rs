//! Common test utilities for integration tests
//!
//! Provides store fixtures shared across integration test files.

#![allow(dead_code)]

use std::sync::Arc;

use engram::adapters::sqlite::{
    create_migrated_test_pool, initialize_database, PoolConfig, SqliteMetricCatalog, SqliteOverlayRepository,
    SqliteResolutionLogRepository, SqliteSemanticEventRepository,
};
use engram::domain::models::{Context, Metric, NewSemanticEvent};
use engram::services::{EventLogService, MetricService, OverlayService, Resolver};
use serde_json::{json, Value};
use sqlx::SqlitePool;
use tempfile::TempDir;

/// Every repository over one pool.
pub struct Store {
    pub pool: SqlitePool,
    pub catalog: Arc<SqliteMetricCatalog>,
    pub events: Arc<SqliteSemanticEventRepository>,
    pub overlays: Arc<SqliteOverlayRepository>,
    pub resolution_log: Arc<SqliteResolutionLogRepository>,
    /// Keeps a file-backed database alive for the test's duration.
    _dir: Option<TempDir>,
}

impl Store {
    /// Private in-memory store.
    pub async fn in_memory() -> Self {
        let pool = create_migrated_test_pool().await.expect("Failed to create test pool");
        Self::from_pool(pool, None)
    }

    /// File-backed store with several connections, for tests that need real
    /// write contention.
    pub async fn on_disk() -> Self {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        let url = format!("sqlite:{}", dir.path().join("engram.db").display());
        let config = PoolConfig {
            max_connections: 8,
            ..PoolConfig::default()
        };
        let pool = initialize_database(&url, Some(config))
            .await
            .expect("Failed to initialize database");
        Self::from_pool(pool, Some(dir))
    }

    fn from_pool(pool: SqlitePool, dir: Option<TempDir>) -> Self {
        Self {
            catalog: Arc::new(SqliteMetricCatalog::new(pool.clone())),
            events: Arc::new(SqliteSemanticEventRepository::new(pool.clone())),
            overlays: Arc::new(SqliteOverlayRepository::new(pool.clone())),
            resolution_log: Arc::new(SqliteResolutionLogRepository::new(pool.clone())),
            pool,
            _dir: dir,
        }
    }

    pub fn metrics(&self) -> MetricService<SqliteMetricCatalog, SqliteSemanticEventRepository> {
        MetricService::new(self.catalog.clone(), self.events.clone())
    }

    pub fn event_log(&self) -> EventLogService<SqliteSemanticEventRepository, SqliteMetricCatalog> {
        EventLogService::new(self.events.clone(), self.catalog.clone())
    }

    pub fn overlay_service(&self) -> OverlayService<SqliteOverlayRepository, SqliteMetricCatalog> {
        OverlayService::new(self.overlays.clone(), self.catalog.clone())
    }

    pub fn resolver(&self) -> Resolver<SqliteSemanticEventRepository, SqliteOverlayRepository> {
        Resolver::new(self.events.clone(), self.overlays.clone())
    }

    /// Register `metric_id` in `workspace_id`.
    pub async fn register(&self, workspace_id: &str, metric_id: &str) -> Metric {
        self.metrics()
            .register(workspace_id, metric_id, metric_id, None)
            .await
            .expect("Failed to register metric")
    }
}

/// A minimal valid metric document: a sum over `amount`.
pub fn base_snapshot() -> Value {
    json!({"definition": {"logic": {"type": "sum", "field": "amount"}}})
}

/// A snapshot event from dbt. The top-level keys of `extra` are laid over
/// [`base_snapshot`].
pub fn snapshot_event(extra: Value) -> NewSemanticEvent {
    let mut snapshot = base_snapshot();
    if let (Some(doc), Value::Object(extra)) = (snapshot.as_object_mut(), extra) {
        doc.extend(extra);
    }
    NewSemanticEvent::new("snapshot", "dbt", snapshot).with_source_ref(json!({"path": "models/metrics.yml"}))
}

/// Build a context or selector from string pairs.
pub fn context(pairs: &[(&str, &str)]) -> Context {
    pairs
        .iter()
        .map(|(k, v)| ((*k).to_string(), Value::String((*v).to_string())))
        .collect()
}
