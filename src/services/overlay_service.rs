//! Overlay store service.

use std::sync::Arc;
use tracing::instrument;
use uuid::Uuid;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{NewOverlay, Overlay};
use crate::domain::ports::{MetricCatalog, OverlayRepository};
use crate::services::patch_engine;

pub struct OverlayService<O: OverlayRepository, C: MetricCatalog> {
    overlays: Arc<O>,
    catalog: Arc<C>,
}

impl<O: OverlayRepository, C: MetricCatalog> OverlayService<O, C> {
    pub fn new(overlays: Arc<O>, catalog: Arc<C>) -> Self {
        Self { overlays, catalog }
    }

    /// Create an overlay. Several overlays may share a selector and priority.
    #[instrument(skip(self, input), fields(priority = input.priority))]
    pub async fn create(&self, workspace_id: &str, metric_id: &str, input: NewOverlay) -> DomainResult<Overlay> {
        patch_engine::validate_patch(&input.overlay_patch)?;
        input.validate().map_err(DomainError::ValidationFailed)?;

        if !self.catalog.exists(workspace_id, metric_id).await? {
            return Err(DomainError::unknown_metric(workspace_id, metric_id));
        }

        let overlay = Overlay::from_new(workspace_id, metric_id, input);
        self.overlays.create(&overlay).await?;

        tracing::info!(overlay_id = %overlay.overlay_id, specificity = overlay.specificity(), "overlay created");
        Ok(overlay)
    }

    /// Every overlay of a metric regardless of context, highest priority first.
    pub async fn list(&self, workspace_id: &str, metric_id: &str) -> DomainResult<Vec<Overlay>> {
        self.overlays.list(workspace_id, metric_id).await
    }

    pub async fn get(&self, workspace_id: &str, overlay_id: Uuid) -> DomainResult<Option<Overlay>> {
        self.overlays.get(workspace_id, overlay_id).await
    }

    pub async fn require(&self, workspace_id: &str, overlay_id: Uuid) -> DomainResult<Overlay> {
        self.get(workspace_id, overlay_id)
            .await?
            .ok_or(DomainError::OverlayNotFound(overlay_id))
    }
}
