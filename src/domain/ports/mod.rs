//! Port trait definitions (Hexagonal Architecture)
//!
//! This module defines async trait interfaces that storage adapters must implement:
//! - MetricCatalog: metric identities and aliases
//! - SemanticEventRepository: append-only event log and latest pointer
//! - OverlayRepository: context-conditional patches
//! - ResolutionLogRepository: resolution audit trail
//!
//! Every operation takes an explicit `workspace_id`; implementations must never
//! read across workspaces.

pub mod event_repository;
pub mod metric_catalog;
pub mod overlay_repository;
pub mod resolution_log_repository;

pub use event_repository::SemanticEventRepository;
pub use metric_catalog::MetricCatalog;
pub use overlay_repository::OverlayRepository;
pub use resolution_log_repository::ResolutionLogRepository;
