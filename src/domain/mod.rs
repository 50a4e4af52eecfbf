//! Domain layer for the engram metric store
//!
//! This module contains the domain models, errors, and the port traits that
//! storage adapters implement.

pub mod errors;
pub mod models;
pub mod ports;

pub use errors::{DomainError, DomainResult};
