//! Overlay domain model.
//!
//! An overlay is a context-conditional patch over a metric's latest snapshot.
//! Overlays are immutable once created; a correction is a new overlay, and an
//! old one is retired by letting its `valid_to` pass.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

/// Exact-match predicate: every key must be present in the context with an equal value.
pub type Selector = Map<String, Value>;

/// Request context an overlay selector is evaluated against.
pub type Context = Map<String, Value>;

/// A stored overlay.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Overlay {
    pub overlay_id: Uuid,
    pub workspace_id: String,
    pub metric_id: String,
    pub selector: Selector,
    /// Higher priority is applied later and wins conflicts.
    pub priority: i32,
    pub overlay_patch: Value,
    /// Inclusive lower bound; `None` is unbounded.
    pub valid_from: Option<DateTime<Utc>>,
    /// Exclusive upper bound; `None` is unbounded.
    pub valid_to: Option<DateTime<Utc>>,
    pub author: Option<String>,
    pub reason: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Overlay {
    pub fn from_new(workspace_id: impl Into<String>, metric_id: impl Into<String>, input: NewOverlay) -> Self {
        Self {
            overlay_id: Uuid::new_v4(),
            workspace_id: workspace_id.into(),
            metric_id: metric_id.into(),
            selector: input.selector,
            priority: input.priority,
            overlay_patch: input.overlay_patch,
            valid_from: input.valid_from,
            valid_to: input.valid_to,
            author: input.author,
            reason: input.reason,
            created_at: super::utc_now(),
        }
    }

    /// Number of selector keys; used as the secondary ordering key.
    pub fn specificity(&self) -> usize {
        self.selector.len()
    }

    /// Whether `now` falls inside `[valid_from, valid_to)`.
    pub fn is_active_at(&self, now: DateTime<Utc>) -> bool {
        if self.valid_from.is_some_and(|from| now < from) {
            return false;
        }
        if self.valid_to.is_some_and(|to| now >= to) {
            return false;
        }
        true
    }
}

/// Caller-supplied part of an overlay.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewOverlay {
    #[serde(default)]
    pub selector: Selector,
    #[serde(default)]
    pub priority: i32,
    pub overlay_patch: Value,
    #[serde(default)]
    pub valid_from: Option<DateTime<Utc>>,
    #[serde(default)]
    pub valid_to: Option<DateTime<Utc>>,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default)]
    pub reason: Option<String>,
}

impl NewOverlay {
    pub fn new(overlay_patch: Value) -> Self {
        Self {
            selector: Selector::new(),
            priority: 0,
            overlay_patch,
            valid_from: None,
            valid_to: None,
            author: None,
            reason: None,
        }
    }

    pub fn with_selector(mut self, selector: Selector) -> Self {
        self.selector = selector;
        self
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_window(mut self, valid_from: Option<DateTime<Utc>>, valid_to: Option<DateTime<Utc>>) -> Self {
        self.valid_from = valid_from;
        self.valid_to = valid_to;
        self
    }

    pub fn with_author(mut self, author: impl Into<String>) -> Self {
        self.author = Some(author.into());
        self
    }

    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// Check the validity window. Patch shape is checked by the patch engine.
    pub fn validate(&self) -> Result<(), String> {
        if let (Some(from), Some(to)) = (self.valid_from, self.valid_to) {
            if from >= to {
                return Err(format!(
                    "valid_from ({}) must be earlier than valid_to ({})",
                    from.to_rfc3339(),
                    to.to_rfc3339()
                ));
            }
        }
        Ok(())
    }
}
