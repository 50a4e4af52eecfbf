//! Semantic event log port.

use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::errors::DomainResult;
use crate::domain::models::{MetricLatest, SemanticEvent};

/// Append-only storage for semantic events and the per-metric latest pointer.
#[async_trait]
pub trait SemanticEventRepository: Send + Sync {
    /// Store `event` and repoint the metric's latest pointer to it, atomically.
    ///
    /// The pointer must currently be at `event.version_id - 1` (or absent when
    /// `event.version_id == 1`). If another writer got there first, nothing is
    /// written and `DomainError::ConcurrencyConflict` is returned.
    async fn append(&self, event: &SemanticEvent) -> DomainResult<()>;

    /// Current latest pointer for a metric, if any events exist.
    async fn latest(&self, workspace_id: &str, metric_id: &str) -> DomainResult<Option<MetricLatest>>;

    /// Events for a metric, newest version first, at most `limit` entries.
    async fn history(&self, workspace_id: &str, metric_id: &str, limit: u32) -> DomainResult<Vec<SemanticEvent>>;

    /// Direct lookup scoped to a workspace.
    async fn get(&self, workspace_id: &str, event_id: Uuid) -> DomainResult<Option<SemanticEvent>>;
}
