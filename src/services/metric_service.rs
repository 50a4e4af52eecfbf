//! Metric identity catalog service.

use std::sync::Arc;
use tracing::instrument;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{Metric, MetricAlias, MetricSummary, NewMetricAlias};
use crate::domain::ports::{MetricCatalog, SemanticEventRepository};

pub struct MetricService<C: MetricCatalog, E: SemanticEventRepository> {
    catalog: Arc<C>,
    events: Arc<E>,
}

impl<C: MetricCatalog, E: SemanticEventRepository> MetricService<C, E> {
    pub fn new(catalog: Arc<C>, events: Arc<E>) -> Self {
        Self { catalog, events }
    }

    /// Register a metric identity. The key must not already exist.
    #[instrument(skip(self, description))]
    pub async fn register(
        &self,
        workspace_id: &str,
        metric_id: &str,
        canonical_name: &str,
        description: Option<String>,
    ) -> DomainResult<Metric> {
        let mut metric = Metric::new(workspace_id, metric_id, canonical_name);
        metric.description = description;
        metric.validate().map_err(DomainError::ValidationFailed)?;

        self.catalog.create(&metric).await?;
        tracing::info!("metric registered");
        Ok(metric)
    }

    pub async fn get(&self, workspace_id: &str, metric_id: &str) -> DomainResult<Option<Metric>> {
        self.catalog.get(workspace_id, metric_id).await
    }

    pub async fn exists(&self, workspace_id: &str, metric_id: &str) -> DomainResult<bool> {
        self.catalog.exists(workspace_id, metric_id).await
    }

    /// Identity plus latest pointer.
    pub async fn summary(&self, workspace_id: &str, metric_id: &str) -> DomainResult<MetricSummary> {
        let metric = self
            .catalog
            .get(workspace_id, metric_id)
            .await?
            .ok_or_else(|| DomainError::metric_not_found(workspace_id, metric_id))?;
        let latest = self.events.latest(workspace_id, metric_id).await?;
        Ok(MetricSummary { metric, latest })
    }

    #[instrument(skip(self, alias), fields(source_system = %alias.source_system))]
    pub async fn upsert_alias(
        &self,
        workspace_id: &str,
        metric_id: &str,
        alias: NewMetricAlias,
    ) -> DomainResult<MetricAlias> {
        alias.validate().map_err(DomainError::ValidationFailed)?;
        if !self.catalog.exists(workspace_id, metric_id).await? {
            return Err(DomainError::metric_not_found(workspace_id, metric_id));
        }
        self.catalog.upsert_alias(workspace_id, metric_id, &alias).await
    }

    pub async fn list_aliases(&self, workspace_id: &str, metric_id: &str) -> DomainResult<Vec<MetricAlias>> {
        self.catalog.list_aliases(workspace_id, metric_id).await
    }
}
