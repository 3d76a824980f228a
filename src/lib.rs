//! DB Gate MCP Library
//!
//! A safety-gated query layer over SQLite and PostgreSQL, exposed to AI
//! assistants as MCP tools. Every statement passes a read/write gate, reads
//! are bounded by a row ceiling, and connections never outlive one call.

pub mod config;
pub mod db;
pub mod error;
pub mod mcp;
pub mod models;
pub mod tools;
pub mod transport;

pub use config::Config;
pub use db::{ConnectionManager, QueryGate, SchemaInspector};
pub use error::{DbError, DbResult};
pub use mcp::DbService;
