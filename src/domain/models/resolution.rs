//! Resolution results and the audit record kept for each of them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use super::overlay::Context;

/// Origin of the base snapshot used in a resolution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Provenance {
    pub source_system: String,
    pub source_ref: Value,
    pub timestamp: DateTime<Utc>,
}

/// Final definition of a metric for one context.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedMetric {
    pub metric_id: String,
    pub base_version_id: i64,
    /// In application order.
    pub applied_overlay_ids: Vec<Uuid>,
    pub resolved_snapshot: Value,
    pub provenance: Provenance,
}

/// Audit trail entry written after a successful resolution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolutionRecord {
    pub record_id: Uuid,
    pub workspace_id: String,
    pub metric_id: String,
    pub context: Context,
    pub base_version_id: i64,
    pub applied_overlay_ids: Vec<Uuid>,
    pub resolved_at: DateTime<Utc>,
}

impl ResolutionRecord {
    pub fn from_resolution(workspace_id: &str, context: &Context, resolved: &ResolvedMetric, at: DateTime<Utc>) -> Self {
        Self {
            record_id: Uuid::new_v4(),
            workspace_id: workspace_id.to_string(),
            metric_id: resolved.metric_id.clone(),
            context: context.clone(),
            base_version_id: resolved.base_version_id,
            applied_overlay_ids: resolved.applied_overlay_ids.clone(),
            resolved_at: at,
        }
    }
}
