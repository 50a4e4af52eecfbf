//! Domain errors for the engram metric store.

use thiserror::Error;
use uuid::Uuid;

/// Domain-level errors that can occur in the engram system.
#[derive(Debug, Error)]
pub enum DomainError {
    #[error("Metric not found: {workspace_id}/{metric_id}")]
    MetricNotFound { workspace_id: String, metric_id: String },

    #[error("Unknown metric: {workspace_id}/{metric_id} is not registered")]
    UnknownMetric { workspace_id: String, metric_id: String },

    #[error("Event not found: {0}")]
    EventNotFound(Uuid),

    #[error("Overlay not found: {0}")]
    OverlayNotFound(Uuid),

    #[error("Validation failed: {0}")]
    ValidationFailed(String),

    #[error("Concurrency conflict: {entity} {id} was modified")]
    ConcurrencyConflict { entity: String, id: String },

    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl DomainError {
    pub fn metric_not_found(workspace_id: &str, metric_id: &str) -> Self {
        Self::MetricNotFound {
            workspace_id: workspace_id.to_string(),
            metric_id: metric_id.to_string(),
        }
    }

    pub fn unknown_metric(workspace_id: &str, metric_id: &str) -> Self {
        Self::UnknownMetric {
            workspace_id: workspace_id.to_string(),
            metric_id: metric_id.to_string(),
        }
    }

    /// Returns true when the caller may retry the same operation.
    ///
    /// Only concurrency conflicts qualify; storage failures are surfaced as-is
    /// because retrying a non-idempotent append could duplicate history.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::ConcurrencyConflict { .. })
    }

    /// Returns true for the "not found" family of errors.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::MetricNotFound { .. } | Self::EventNotFound(_) | Self::OverlayNotFound(_)
        )
    }
}

pub type DomainResult<T> = Result<T, DomainError>;

impl From<sqlx::Error> for DomainError {
    fn from(err: sqlx::Error) -> Self {
        DomainError::DatabaseError(err.to_string())
    }
}

impl From<serde_json::Error> for DomainError {
    fn from(err: serde_json::Error) -> Self {
        DomainError::SerializationError(err.to_string())
    }
}
