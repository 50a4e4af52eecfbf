//! Resolution of a metric's effective definition for a request context.
//!
//! The latest snapshot is the base. Applicable overlays are selected and
//! folded over it through the patch engine in application order. The result
//! carries the provenance of the base event and the ids of the overlays that
//! were applied.

use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::instrument;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{utc_now, Context, ResolutionRecord, ResolvedMetric};
use crate::domain::ports::{OverlayRepository, SemanticEventRepository};
use crate::services::overlay_selector;
use crate::services::patch_engine;
use crate::services::resolution_audit::ResolutionAuditHandle;

pub struct Resolver<E: SemanticEventRepository, O: OverlayRepository> {
    events: Arc<E>,
    overlays: Arc<O>,
    audit: Option<ResolutionAuditHandle>,
}

impl<E: SemanticEventRepository, O: OverlayRepository> Resolver<E, O> {
    pub fn new(events: Arc<E>, overlays: Arc<O>) -> Self {
        Self {
            events,
            overlays,
            audit: None,
        }
    }

    /// Offer a record of every successful resolution to `audit`.
    pub fn with_audit(mut self, audit: ResolutionAuditHandle) -> Self {
        self.audit = Some(audit);
        self
    }

    /// Resolve against the current instant.
    pub async fn resolve(&self, workspace_id: &str, metric_id: &str, context: &Context) -> DomainResult<ResolvedMetric> {
        self.resolve_at(workspace_id, metric_id, context, Utc::now()).await
    }

    /// Resolve with overlay validity windows evaluated at `now`.
    ///
    /// Fails with `MetricNotFound` when the metric has no events. Never writes
    /// to the store; the audit record goes through the background queue.
    #[instrument(skip(self, context), fields(context_keys = context.len()))]
    pub async fn resolve_at(
        &self,
        workspace_id: &str,
        metric_id: &str,
        context: &Context,
        now: DateTime<Utc>,
    ) -> DomainResult<ResolvedMetric> {
        let latest = self
            .events
            .latest(workspace_id, metric_id)
            .await?
            .ok_or_else(|| DomainError::metric_not_found(workspace_id, metric_id))?;

        let (base, overlays) = futures::try_join!(
            self.events.get(workspace_id, latest.latest_event_id),
            self.overlays.list(workspace_id, metric_id),
        )?;
        let base = base.ok_or(DomainError::EventNotFound(latest.latest_event_id))?;
        let selected = overlay_selector::select(&overlays, context, now);

        let mut snapshot = base.snapshot.clone();
        let mut applied_overlay_ids = Vec::with_capacity(selected.len());
        for overlay in selected {
            snapshot = patch_engine::apply(&snapshot, &overlay.overlay_patch)?;
            applied_overlay_ids.push(overlay.overlay_id);
        }

        tracing::debug!(
            base_version_id = base.version_id,
            candidates = overlays.len(),
            applied = applied_overlay_ids.len(),
            "metric resolved"
        );

        let resolved = ResolvedMetric {
            metric_id: metric_id.to_string(),
            base_version_id: base.version_id,
            applied_overlay_ids,
            resolved_snapshot: snapshot,
            provenance: base.provenance(),
        };

        if let Some(audit) = &self.audit {
            audit.offer(ResolutionRecord::from_resolution(workspace_id, context, &resolved, utc_now()));
        }

        Ok(resolved)
    }
}
