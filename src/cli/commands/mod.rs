//! CLI command implementations.

pub mod audit;
pub mod event;
pub mod init;
pub mod metric;
pub mod overlay;
pub mod resolve;
pub mod seed;
