//! Metric identity catalog port.

use async_trait::async_trait;

use crate::domain::errors::DomainResult;
use crate::domain::models::{Metric, MetricAlias, NewMetricAlias};

/// Repository interface for metric identities and their aliases.
#[async_trait]
pub trait MetricCatalog: Send + Sync {
    /// Register a new metric identity. Fails if the key already exists.
    async fn create(&self, metric: &Metric) -> DomainResult<()>;

    /// Get a metric by its workspace-scoped key.
    async fn get(&self, workspace_id: &str, metric_id: &str) -> DomainResult<Option<Metric>>;

    /// Whether a metric is registered in the workspace.
    async fn exists(&self, workspace_id: &str, metric_id: &str) -> DomainResult<bool>;

    /// Insert or re-point an alias keyed by `(source_system, source_locator)`.
    async fn upsert_alias(
        &self,
        workspace_id: &str,
        metric_id: &str,
        alias: &NewMetricAlias,
    ) -> DomainResult<MetricAlias>;

    /// List aliases that point at a metric.
    async fn list_aliases(&self, workspace_id: &str, metric_id: &str) -> DomainResult<Vec<MetricAlias>>;
}
