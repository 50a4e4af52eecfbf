//! Core algorithms and use-case services.
//!
//! [`patch_engine`] and [`overlay_selector`] are pure functions. The services
//! are generic over the storage ports and hold them behind `Arc`.

pub mod event_log;
pub mod manifest_loader;
pub mod metric_service;
pub mod overlay_selector;
pub mod overlay_service;
pub mod patch_engine;
pub mod resolution_audit;
pub mod resolver;

pub use event_log::EventLogService;
pub use manifest_loader::{Manifest, ManifestError, ManifestLoader, ManifestReport};
pub use metric_service::MetricService;
pub use overlay_service::OverlayService;
pub use patch_engine::PatchError;
pub use resolution_audit::{ResolutionAudit, ResolutionAuditHandle};
pub use resolver::Resolver;
