//! Data models for the query gate.
//!
//! This module re-exports all model types used throughout the application.

pub mod connection;
pub mod query;
pub mod schema;

// Re-export commonly used types
pub use connection::{EngineConfig, EngineKind, Policy};
pub use query::{QueryParam, QueryResult, RawRows, Statement, WriteResult};
pub use schema::{ColumnDescriptor, RawColumn, TableDescriptor, TableEntry, TableKind};
