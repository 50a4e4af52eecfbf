//! Engram - versioned metric semantics with contextual overlays
//!
//! Engram keeps an append-only history of metric definitions per workspace
//! and resolves the effective definition for a request context by folding
//! matching overlays over the latest snapshot.
//!
//! # Architecture
//!
//! This crate follows Hexagonal Architecture principles:
//!
//! - **Domain Layer** (`domain`): models, errors and port traits
//! - **Adapters** (`adapters`): `SQLite` implementations of the ports
//! - **Service Layer** (`services`): patch engine, overlay selection, event
//!   log, resolver and manifest seeding
//! - **Infrastructure Layer** (`infrastructure`): configuration and logging
//! - **CLI Layer** (`cli`): command-line interface
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use engram::adapters::sqlite::{initialize_database, SqliteOverlayRepository, SqliteSemanticEventRepository};
//! use engram::services::Resolver;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let pool = initialize_database("sqlite:.engram/engram.db", None).await?;
//!     let resolver = Resolver::new(
//!         Arc::new(SqliteSemanticEventRepository::new(pool.clone())),
//!         Arc::new(SqliteOverlayRepository::new(pool)),
//!     );
//!     let resolved = resolver.resolve("default", "revenue", &Default::default()).await?;
//!     println!("{}", resolved.resolved_snapshot);
//!     Ok(())
//! }
//! ```

pub mod adapters;
pub mod cli;
pub mod domain;
pub mod infrastructure;
pub mod services;

// Re-export commonly used types for convenience
pub use domain::models::{
    Config, Context, Metric, MetricAlias, MetricLatest, NewMetricAlias, NewOverlay, NewSemanticEvent, Overlay,
    Provenance, ResolutionRecord, ResolvedMetric, SemanticEvent,
};
pub use domain::ports::{MetricCatalog, OverlayRepository, ResolutionLogRepository, SemanticEventRepository};
pub use domain::{DomainError, DomainResult};
pub use infrastructure::config::{ConfigError, ConfigLoader};
pub use services::{EventLogService, ManifestLoader, MetricService, OverlayService, Resolver};
