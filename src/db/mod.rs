//! Database abstraction layer.
//!
//! This module provides database access functionality:
//! - Engine adapters (fresh SQLite connections, pooled PostgreSQL connections)
//! - Connection lifecycle management
//! - The query gate (classification and read-only policy)
//! - Result coercion and schema introspection
//! - Type mappings

#[cfg(not(any(feature = "sqlite", feature = "postgres")))]
compile_error!("enable at least one database engine feature: `sqlite` or `postgres`");

pub mod adapter;
pub mod coerce;
#[cfg(feature = "sqlite")]
pub mod direct;
pub mod gate;
pub mod pool;
#[cfg(feature = "postgres")]
pub mod pooled;
pub mod schema;
pub mod types;

pub use adapter::EngineAdapter;
pub use gate::{Classification, QueryGate, Routed, authorize, classify, route};
pub use pool::{ConnectionHandle, ConnectionManager};
pub use schema::{DEFAULT_SAMPLE_LIMIT, SchemaInspector};
