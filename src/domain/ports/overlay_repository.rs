//! Overlay store port.

use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::errors::DomainResult;
use crate::domain::models::Overlay;

/// Repository interface for overlay persistence.
#[async_trait]
pub trait OverlayRepository: Send + Sync {
    /// Insert an overlay. Duplicate selector/priority pairs are allowed.
    async fn create(&self, overlay: &Overlay) -> DomainResult<()>;

    /// All overlays of a metric, priority DESC then created_at DESC.
    async fn list(&self, workspace_id: &str, metric_id: &str) -> DomainResult<Vec<Overlay>>;

    /// Get an overlay by ID within a workspace.
    async fn get(&self, workspace_id: &str, overlay_id: Uuid) -> DomainResult<Option<Overlay>>;
}
