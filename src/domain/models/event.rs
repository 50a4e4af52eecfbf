//! Semantic event domain model.
//!
//! Every change to a metric's definition is recorded as an immutable
//! [`SemanticEvent`] carrying the full snapshot as of that version. The
//! [`MetricLatest`] pointer caches the highest version per metric.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// One immutable fact in the history of a metric's definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SemanticEvent {
    pub event_id: Uuid,
    pub workspace_id: String,
    pub metric_id: String,
    /// Gapless, starting at 1 per `(workspace_id, metric_id)`.
    pub version_id: i64,
    pub event_type: String,
    pub timestamp: DateTime<Utc>,
    pub source_system: String,
    pub source_ref: Value,
    pub reason: Option<String>,
    pub actor: Option<String>,
    pub snapshot: Value,
}

impl SemanticEvent {
    /// Build the event that follows `previous_version` for the given input.
    pub fn next(
        workspace_id: impl Into<String>,
        metric_id: impl Into<String>,
        previous_version: i64,
        input: NewSemanticEvent,
    ) -> Self {
        Self {
            event_id: Uuid::new_v4(),
            workspace_id: workspace_id.into(),
            metric_id: metric_id.into(),
            version_id: previous_version + 1,
            event_type: input.event_type,
            timestamp: super::utc_now(),
            source_system: input.source_system,
            source_ref: input.source_ref,
            reason: input.reason,
            actor: input.actor,
            snapshot: input.snapshot,
        }
    }

    /// Provenance of this event, as attached to resolutions built on it.
    pub fn provenance(&self) -> super::Provenance {
        super::Provenance {
            source_system: self.source_system.clone(),
            source_ref: self.source_ref.clone(),
            timestamp: self.timestamp,
        }
    }
}

/// Producer-supplied part of a semantic event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewSemanticEvent {
    pub event_type: String,
    pub source_system: String,
    #[serde(default = "empty_object")]
    pub source_ref: Value,
    #[serde(default)]
    pub reason: Option<String>,
    #[serde(default)]
    pub actor: Option<String>,
    pub snapshot: Value,
}

fn empty_object() -> Value {
    Value::Object(serde_json::Map::new())
}

impl NewSemanticEvent {
    pub fn new(event_type: impl Into<String>, source_system: impl Into<String>, snapshot: Value) -> Self {
        Self {
            event_type: event_type.into(),
            source_system: source_system.into(),
            source_ref: empty_object(),
            reason: None,
            actor: None,
            snapshot,
        }
    }

    pub fn with_source_ref(mut self, source_ref: Value) -> Self {
        self.source_ref = source_ref;
        self
    }

    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    pub fn with_actor(mut self, actor: impl Into<String>) -> Self {
        self.actor = Some(actor.into());
        self
    }

    /// Check the minimal snapshot shape: an object with `definition.logic` objects.
    pub fn validate(&self) -> Result<(), String> {
        if self.event_type.trim().is_empty() {
            return Err("event_type cannot be empty".to_string());
        }
        if self.source_system.trim().is_empty() {
            return Err("source_system cannot be empty".to_string());
        }
        if !(self.source_ref.is_object() || self.source_ref.is_null()) {
            return Err("source_ref must be an object".to_string());
        }
        let Some(snapshot) = self.snapshot.as_object() else {
            return Err("snapshot must be an object".to_string());
        };
        let Some(definition) = snapshot.get("definition").and_then(Value::as_object) else {
            return Err("snapshot.definition required".to_string());
        };
        if !definition.get("logic").is_some_and(Value::is_object) {
            return Err("snapshot.definition.logic required".to_string());
        }
        Ok(())
    }
}

/// Per-metric pointer to the highest appended version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricLatest {
    pub workspace_id: String,
    pub metric_id: String,
    pub latest_version_id: i64,
    pub latest_event_id: Uuid,
    pub updated_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn snapshot() -> Value {
        json!({
            "definition": {"display": "rev", "logic": {"type": "sum", "field": "x", "filters": []}},
            "grain": "day",
            "dimensions": [],
            "units": "usd"
        })
    }

    #[test]
    fn test_next_increments_version() {
        let event = SemanticEvent::next("default", "revenue", 4, NewSemanticEvent::new("snapshot", "dbt", snapshot()));
        assert_eq!(event.version_id, 5);
        assert_eq!(event.workspace_id, "default");
        assert_eq!(event.source_ref, json!({}));
    }

    #[test]
    fn test_validate_requires_definition_logic() {
        assert!(NewSemanticEvent::new("snapshot", "dbt", snapshot()).validate().is_ok());

        let missing_def = NewSemanticEvent::new("snapshot", "dbt", json!({"grain": "day"}));
        assert_eq!(missing_def.validate().unwrap_err(), "snapshot.definition required");

        let missing_logic = NewSemanticEvent::new("snapshot", "dbt", json!({"definition": {"display": "x"}}));
        assert_eq!(missing_logic.validate().unwrap_err(), "snapshot.definition.logic required");

        let not_object = NewSemanticEvent::new("snapshot", "dbt", json!(["a"]));
        assert!(not_object.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_scalar_source_ref() {
        let event = NewSemanticEvent::new("snapshot", "dbt", snapshot()).with_source_ref(json!("abc"));
        assert!(event.validate().is_err());
    }

    #[test]
    fn test_deserialize_defaults_source_ref() {
        let input: NewSemanticEvent = serde_json::from_value(json!({
            "event_type": "snapshot",
            "source_system": "dbt",
            "snapshot": snapshot()
        }))
        .unwrap();
        assert_eq!(input.source_ref, json!({}));
        assert!(input.reason.is_none());
    }
}
