//! Metric identity domain model.
//!
//! A metric is identified by `(workspace_id, metric_id)`. The identity row is
//! immutable once created; its definition lives in the semantic event log.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::event::MetricLatest;

/// Lifecycle status of a metric identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum MetricStatus {
    #[default]
    Active,
    Retired,
}

impl MetricStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Retired => "retired",
        }
    }

    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "active" => Some(Self::Active),
            "retired" => Some(Self::Retired),
            _ => None,
        }
    }
}

/// A registered metric identity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Metric {
    pub workspace_id: String,
    pub metric_id: String,
    pub canonical_name: String,
    pub description: Option<String>,
    pub status: MetricStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Metric {
    pub fn new(
        workspace_id: impl Into<String>,
        metric_id: impl Into<String>,
        canonical_name: impl Into<String>,
    ) -> Self {
        let now = super::utc_now();
        Self {
            workspace_id: workspace_id.into(),
            metric_id: metric_id.into(),
            canonical_name: canonical_name.into(),
            description: None,
            status: MetricStatus::Active,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Validate identity fields before registration.
    pub fn validate(&self) -> Result<(), String> {
        if self.workspace_id.trim().is_empty() {
            return Err("workspace_id cannot be empty".to_string());
        }
        if self.metric_id.trim().is_empty() {
            return Err("metric_id cannot be empty".to_string());
        }
        if self.canonical_name.trim().is_empty() {
            return Err("canonical_name cannot be empty".to_string());
        }
        Ok(())
    }
}

/// An external name for a metric, keyed by where it was seen.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricAlias {
    pub alias_id: Uuid,
    pub workspace_id: String,
    pub metric_id: String,
    pub source_system: String,
    pub source_locator: String,
    pub alias_name: String,
    pub confidence: f64,
    pub first_seen_at: DateTime<Utc>,
    pub last_seen_at: DateTime<Utc>,
}

/// Default confidence assigned to aliases upserted without one.
pub const DEFAULT_ALIAS_CONFIDENCE: f64 = 0.5;

/// Input for upserting an alias.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewMetricAlias {
    pub source_system: String,
    pub source_locator: String,
    pub alias_name: String,
    #[serde(default)]
    pub confidence: Option<f64>,
}

impl NewMetricAlias {
    pub fn validate(&self) -> Result<(), String> {
        if self.source_system.trim().is_empty() || self.source_locator.trim().is_empty() {
            return Err("alias source_system and source_locator are required".to_string());
        }
        if self.alias_name.trim().is_empty() {
            return Err("alias_name cannot be empty".to_string());
        }
        if let Some(c) = self.confidence {
            if !(0.0..=1.0).contains(&c) {
                return Err(format!("alias confidence {c} must be between 0.0 and 1.0"));
            }
        }
        Ok(())
    }
}

/// Identity plus its current latest pointer, if any events exist.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricSummary {
    pub metric: Metric,
    pub latest: Option<MetricLatest>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_round_trip_strings() {
        assert_eq!(MetricStatus::from_str("ACTIVE"), Some(MetricStatus::Active));
        assert_eq!(MetricStatus::from_str("retired"), Some(MetricStatus::Retired));
        assert_eq!(MetricStatus::from_str("paused"), None);
        assert_eq!(MetricStatus::Retired.as_str(), "retired");
    }

    #[test]
    fn test_validate_rejects_blank_fields() {
        assert!(Metric::new("default", "revenue", "Revenue").validate().is_ok());
        assert!(Metric::new("default", " ", "Revenue").validate().is_err());
        assert!(Metric::new("default", "revenue", "").validate().is_err());
        assert!(Metric::new("", "revenue", "Revenue").validate().is_err());
    }

    #[test]
    fn test_alias_confidence_bounds() {
        let mut alias = NewMetricAlias {
            source_system: "dbt".to_string(),
            source_locator: "models/revenue.yml".to_string(),
            alias_name: "total revenue".to_string(),
            confidence: Some(0.9),
        };
        assert!(alias.validate().is_ok());
        alias.confidence = Some(1.5);
        assert!(alias.validate().is_err());
    }
}
