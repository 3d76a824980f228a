//! MCP tool implementations.
//!
//! This module contains all database tool handlers:
//! - `execute_query`: Execute SELECT queries
//! - `execute_write`: Execute write operations (INSERT/UPDATE/DELETE/DDL)
//! - `list_tables`: List tables and views
//! - `describe_table`: Get column, primary-key and row-count information
//! - `get_sample_data`: Read the first rows of a table

pub mod query;
pub mod schema;
pub mod write;

pub use query::{QueryInput, QueryOutput, QueryToolHandler};
pub use schema::{
    DescribeTableInput, DescribeTableOutput, ListTablesOutput, SampleDataInput, SchemaToolHandler,
};
pub use write::{ExecuteInput, ExecuteOutput, WriteToolHandler};
