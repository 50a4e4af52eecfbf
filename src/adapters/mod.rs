//! Storage adapters for the engram metric store.

pub mod sqlite;
