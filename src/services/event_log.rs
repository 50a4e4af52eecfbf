//! Event log service: appends versioned semantic events and reads history.

use std::sync::Arc;
use tracing::instrument;
use uuid::Uuid;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{MetricLatest, NewSemanticEvent, SemanticEvent, MAX_HISTORY_LIMIT};
use crate::domain::ports::{MetricCatalog, SemanticEventRepository};

pub struct EventLogService<E: SemanticEventRepository, C: MetricCatalog> {
    events: Arc<E>,
    catalog: Arc<C>,
}

impl<E: SemanticEventRepository, C: MetricCatalog> EventLogService<E, C> {
    pub fn new(events: Arc<E>, catalog: Arc<C>) -> Self {
        Self { events, catalog }
    }

    /// Append the next version of a metric's definition.
    ///
    /// The new event gets `latest + 1` as its version. If another writer
    /// appends in between, the call fails with `ConcurrencyConflict` and
    /// nothing is written; it is never retried here.
    #[instrument(skip(self, input), fields(event_type = %input.event_type))]
    pub async fn append(
        &self,
        workspace_id: &str,
        metric_id: &str,
        input: NewSemanticEvent,
    ) -> DomainResult<SemanticEvent> {
        input.validate().map_err(DomainError::ValidationFailed)?;

        if !self.catalog.exists(workspace_id, metric_id).await? {
            return Err(DomainError::unknown_metric(workspace_id, metric_id));
        }

        let previous = self.get_latest_version(workspace_id, metric_id).await?;
        let event = SemanticEvent::next(workspace_id, metric_id, previous, input);

        match self.events.append(&event).await {
            Ok(()) => {
                tracing::info!(
                    version_id = event.version_id,
                    event_id = %event.event_id,
                    "semantic event appended"
                );
                Ok(event)
            }
            Err(e) => {
                if e.is_retryable() {
                    tracing::warn!(attempted_version = event.version_id, "append lost a concurrent race");
                }
                Err(e)
            }
        }
    }

    /// Highest version appended so far, 0 when the metric has no events.
    pub async fn get_latest_version(&self, workspace_id: &str, metric_id: &str) -> DomainResult<i64> {
        Ok(self
            .events
            .latest(workspace_id, metric_id)
            .await?
            .map(|latest| latest.latest_version_id)
            .unwrap_or(0))
    }

    pub async fn get_latest(&self, workspace_id: &str, metric_id: &str) -> DomainResult<Option<MetricLatest>> {
        self.events.latest(workspace_id, metric_id).await
    }

    /// Events newest first. `limit` must be between 1 and 500.
    #[instrument(skip(self))]
    pub async fn get_history(&self, workspace_id: &str, metric_id: &str, limit: u32) -> DomainResult<Vec<SemanticEvent>> {
        if limit == 0 || limit > MAX_HISTORY_LIMIT {
            return Err(DomainError::ValidationFailed(format!(
                "history limit must be between 1 and {MAX_HISTORY_LIMIT}, got {limit}"
            )));
        }
        self.events.history(workspace_id, metric_id, limit).await
    }

    pub async fn get_event_by_id(&self, workspace_id: &str, event_id: Uuid) -> DomainResult<Option<SemanticEvent>> {
        self.events.get(workspace_id, event_id).await
    }

    /// Like [`Self::get_event_by_id`] but absent events are an error.
    pub async fn require_event(&self, workspace_id: &str, event_id: Uuid) -> DomainResult<SemanticEvent> {
        self.get_event_by_id(workspace_id, event_id)
            .await?
            .ok_or(DomainError::EventNotFound(event_id))
    }
}
