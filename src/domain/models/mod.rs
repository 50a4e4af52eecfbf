//! Domain models for the engram metric store.

pub mod config;
pub mod event;
pub mod metric;
pub mod overlay;
pub mod resolution;

pub use config::{Config, DatabaseConfig, LoggingConfig, ResolutionConfig, MAX_HISTORY_LIMIT};
pub use event::{MetricLatest, NewSemanticEvent, SemanticEvent};
pub use metric::{Metric, MetricAlias, MetricStatus, MetricSummary, NewMetricAlias, DEFAULT_ALIAS_CONFIDENCE};
pub use overlay::{Context, NewOverlay, Overlay, Selector};
pub use resolution::{Provenance, ResolutionRecord, ResolvedMetric};

use chrono::{DateTime, SubsecRound, Utc};

/// Current instant at the microsecond precision the store persists.
pub fn utc_now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(6)
}
