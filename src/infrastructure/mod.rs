//! Infrastructure layer module
//!
//! Process-level concerns that sit outside the domain:
//! - Configuration management (figment)
//! - Logging initialisation (tracing)
//!
//! Storage adapters live in [`crate::adapters`].

pub mod config;
pub mod logging;
