//! Seeding the store from a YAML manifest.
//!
//! A manifest lists metrics together with their aliases, events, overlays and
//! sample resolutions. Applying it twice is harmless:
//! - metrics that already exist are left alone;
//! - aliases are upserted;
//! - an event is skipped when its type, source system, source reference and
//!   snapshot match one of the metric's newest `MAX_HISTORY_LIMIT` (500)
//!   events. An identical event older than that is appended again;
//! - an overlay is skipped when one with the same selector and priority exists.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;

use crate::domain::errors::DomainError;
use crate::domain::models::{
    Context, NewMetricAlias, NewOverlay, NewSemanticEvent, Overlay, ResolvedMetric, SemanticEvent, MAX_HISTORY_LIMIT,
};
use crate::domain::ports::{MetricCatalog, OverlayRepository, SemanticEventRepository};
use crate::services::event_log::EventLogService;
use crate::services::metric_service::MetricService;
use crate::services::overlay_service::OverlayService;
use crate::services::resolution_audit::ResolutionAuditHandle;
use crate::services::resolver::Resolver;

#[derive(Debug, Error)]
pub enum ManifestError {
    #[error("Failed to read manifest {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse manifest: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("Manifest metric {metric_id}: {source}")]
    Apply {
        metric_id: String,
        #[source]
        source: DomainError,
    },
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Manifest {
    #[serde(default)]
    pub workspace_id: Option<String>,
    #[serde(default)]
    pub metrics: Vec<MetricManifest>,
}

impl Manifest {
    pub fn parse(yaml: &str) -> Result<Self, ManifestError> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ManifestError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ManifestError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::parse(&text)
    }

    /// Workspace named in the manifest, or `fallback` when it names none.
    pub fn workspace_or<'a>(&'a self, fallback: &'a str) -> &'a str {
        self.workspace_id.as_deref().filter(|ws| !ws.trim().is_empty()).unwrap_or(fallback)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricManifest {
    pub metric_id: String,
    pub canonical_name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub aliases: Vec<NewMetricAlias>,
    #[serde(default)]
    pub events: Vec<NewSemanticEvent>,
    #[serde(default)]
    pub overlays: Vec<NewOverlay>,
    #[serde(default)]
    pub resolves: Vec<SampleResolution>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SampleResolution {
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub context: Context,
}

#[derive(Debug, Clone, Serialize)]
pub struct SampleResolutionResult {
    pub metric_id: String,
    pub label: String,
    pub context: Context,
    pub resolved: ResolvedMetric,
}

/// What applying a manifest changed.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ManifestReport {
    pub workspace_id: String,
    pub metrics_registered: usize,
    pub metrics_existing: usize,
    pub aliases_upserted: usize,
    pub events_appended: usize,
    pub events_skipped: usize,
    pub overlays_created: usize,
    pub overlays_skipped: usize,
    pub resolutions: Vec<SampleResolutionResult>,
}

pub struct ManifestLoader<C, E, O>
where
    C: MetricCatalog,
    E: SemanticEventRepository,
    O: OverlayRepository,
{
    metrics: MetricService<C, E>,
    events: EventLogService<E, C>,
    overlays: OverlayService<O, C>,
    resolver: Resolver<E, O>,
}

impl<C, E, O> ManifestLoader<C, E, O>
where
    C: MetricCatalog,
    E: SemanticEventRepository,
    O: OverlayRepository,
{
    pub fn new(catalog: Arc<C>, events: Arc<E>, overlays: Arc<O>) -> Self {
        Self {
            metrics: MetricService::new(catalog.clone(), events.clone()),
            events: EventLogService::new(events.clone(), catalog.clone()),
            overlays: OverlayService::new(overlays.clone(), catalog),
            resolver: Resolver::new(events, overlays),
        }
    }

    /// Audit the sample resolutions like any other resolution.
    pub fn with_audit(mut self, audit: ResolutionAuditHandle) -> Self {
        self.resolver = self.resolver.with_audit(audit);
        self
    }

    /// Apply every metric of `manifest` into `workspace_id`, in document order.
    /// Stops at the first failing metric; work done before it is kept.
    pub async fn apply(&self, manifest: &Manifest, workspace_id: &str) -> Result<ManifestReport, ManifestError> {
        let mut report = ManifestReport {
            workspace_id: workspace_id.to_string(),
            ..ManifestReport::default()
        };

        for metric in &manifest.metrics {
            self.apply_metric(workspace_id, metric, &mut report)
                .await
                .map_err(|source| ManifestError::Apply {
                    metric_id: metric.metric_id.clone(),
                    source,
                })?;
        }

        tracing::info!(
            workspace_id,
            metrics_registered = report.metrics_registered,
            events_appended = report.events_appended,
            events_skipped = report.events_skipped,
            overlays_created = report.overlays_created,
            overlays_skipped = report.overlays_skipped,
            "manifest applied"
        );
        Ok(report)
    }

    async fn apply_metric(
        &self,
        workspace_id: &str,
        manifest: &MetricManifest,
        report: &mut ManifestReport,
    ) -> Result<(), DomainError> {
        let metric_id = manifest.metric_id.as_str();

        if self.metrics.exists(workspace_id, metric_id).await? {
            report.metrics_existing += 1;
        } else {
            self.metrics
                .register(workspace_id, metric_id, &manifest.canonical_name, manifest.description.clone())
                .await?;
            report.metrics_registered += 1;
        }

        for alias in &manifest.aliases {
            self.metrics.upsert_alias(workspace_id, metric_id, alias.clone()).await?;
            report.aliases_upserted += 1;
        }

        let mut history = self.events.get_history(workspace_id, metric_id, MAX_HISTORY_LIMIT).await?;
        for event in &manifest.events {
            if history.iter().any(|existing| same_event(existing, event)) {
                tracing::debug!(metric_id, event_type = %event.event_type, "event already recorded, skipping");
                report.events_skipped += 1;
                continue;
            }
            let appended = self.events.append(workspace_id, metric_id, event.clone()).await?;
            history.push(appended);
            report.events_appended += 1;
        }

        let mut overlays = self.overlays.list(workspace_id, metric_id).await?;
        for overlay in &manifest.overlays {
            if overlays.iter().any(|existing| same_overlay(existing, overlay)) {
                tracing::debug!(metric_id, priority = overlay.priority, "overlay already present, skipping");
                report.overlays_skipped += 1;
                continue;
            }
            let created = self.overlays.create(workspace_id, metric_id, overlay.clone()).await?;
            overlays.push(created);
            report.overlays_created += 1;
        }

        for (index, sample) in manifest.resolves.iter().enumerate() {
            let resolved = self.resolver.resolve(workspace_id, metric_id, &sample.context).await?;
            report.resolutions.push(SampleResolutionResult {
                metric_id: metric_id.to_string(),
                label: sample.label.clone().unwrap_or_else(|| format!("resolve #{}", index + 1)),
                context: sample.context.clone(),
                resolved,
            });
        }

        Ok(())
    }
}

/// A missing or `null` source reference counts as an empty object.
fn normalized_source_ref(value: &Value) -> Value {
    match value {
        Value::Null => Value::Object(serde_json::Map::new()),
        other => other.clone(),
    }
}

fn same_event(existing: &SemanticEvent, candidate: &NewSemanticEvent) -> bool {
    existing.event_type == candidate.event_type
        && existing.source_system == candidate.source_system
        && normalized_source_ref(&existing.source_ref) == normalized_source_ref(&candidate.source_ref)
        && existing.snapshot == candidate.snapshot
}

fn same_overlay(existing: &Overlay, candidate: &NewOverlay) -> bool {
    existing.priority == candidate.priority && existing.selector == candidate.selector
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const MANIFEST: &str = r#"
workspace_id: demo
metrics:
  - metric_id: revenue
    canonical_name: Revenue
    events:
      - event_type: snapshot
        source_system: dbt
        snapshot:
          definition:
            display: Revenue
            logic: {type: sum, field: amount}
          grain: day
    overlays:
      - selector: {team: marketing}
        priority: 5
        overlay_patch: {grain: week}
        valid_to: "2030-01-01T00:00:00Z"
    resolves:
      - label: marketing
        context: {team: marketing}
"#;

    #[test]
    fn test_parse_manifest() {
        let manifest = Manifest::parse(MANIFEST).unwrap();
        assert_eq!(manifest.workspace_or("default"), "demo");
        let metric = &manifest.metrics[0];
        assert_eq!(metric.events[0].source_ref, json!({}));
        assert_eq!(metric.events[0].snapshot["definition"]["logic"]["type"], "sum");
        assert_eq!(metric.overlays[0].priority, 5);
        assert!(metric.overlays[0].valid_to.is_some());
        assert_eq!(metric.resolves[0].context.get("team"), Some(&json!("marketing")));
    }

    #[test]
    fn test_workspace_fallback() {
        let manifest = Manifest::parse("metrics: []").unwrap();
        assert_eq!(manifest.workspace_or("default"), "default");
    }

    #[test]
    fn test_same_event_treats_null_source_ref_as_empty() {
        let snapshot = json!({"definition": {"logic": {}}});
        let existing = SemanticEvent::next(
            "default",
            "revenue",
            0,
            NewSemanticEvent::new("snapshot", "dbt", snapshot.clone()).with_source_ref(Value::Null),
        );
        assert!(same_event(&existing, &NewSemanticEvent::new("snapshot", "dbt", snapshot.clone())));
        assert!(!same_event(&existing, &NewSemanticEvent::new("snapshot", "looker", snapshot)));
    }

    #[test]
    fn test_malformed_manifest() {
        assert!(matches!(Manifest::parse("metrics: 3"), Err(ManifestError::Parse(_))));
    }
}
