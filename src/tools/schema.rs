//! Schema introspection tools.
//!
//! This module implements the `list_tables`, `describe_table` and
//! `get_sample_data` MCP tools.

use crate::db::{DEFAULT_SAMPLE_LIMIT, SchemaInspector};
use crate::error::DbResult;
use crate::models::{EngineKind, TableDescriptor, TableEntry};
use crate::tools::query::QueryOutput;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Largest `limit` accepted by get_sample_data.
pub const MAX_SAMPLE_LIMIT: u32 = 100;

/// Output from the list_tables tool.
#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct ListTablesOutput {
    /// Engine the server is connected to
    pub engine: EngineKind,
    /// Tables and views, ordered by name
    pub tables: Vec<TableEntry>,
    /// Total number of tables/views returned
    pub count: usize,
}

/// Input for the describe_table tool.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct DescribeTableInput {
    /// Table name to describe
    pub table_name: String,
}

/// Output from the describe_table tool.
pub type DescribeTableOutput = TableDescriptor;

fn default_sample_limit() -> u32 {
    DEFAULT_SAMPLE_LIMIT
}

/// Input for the get_sample_data tool.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct SampleDataInput {
    /// Table name to sample
    pub table_name: String,
    /// Number of rows to return. Default: 5, max: 100. Also capped by the server's row limit.
    #[serde(default = "default_sample_limit")]
    pub limit: u32,
}

#[derive(Debug, Clone)]
pub struct SchemaToolHandler {
    inspector: SchemaInspector,
    engine: EngineKind,
    max_rows: u32,
}

impl SchemaToolHandler {
    pub fn new(inspector: SchemaInspector, engine: EngineKind, max_rows: u32) -> Self {
        Self {
            inspector,
            engine,
            max_rows,
        }
    }

    pub async fn list_tables(&self) -> DbResult<ListTablesOutput> {
        let tables = self.inspector.list_tables().await?;
        Ok(ListTablesOutput {
            engine: self.engine,
            count: tables.len(),
            tables,
        })
    }

    pub async fn describe_table(&self, input: DescribeTableInput) -> DbResult<DescribeTableOutput> {
        self.inspector.describe_table(input.table_name.trim()).await
    }

    pub async fn get_sample_data(&self, input: SampleDataInput) -> DbResult<QueryOutput> {
        let (limit, limit_warning) = clamp_sample_limit(input.limit);
        let result = self
            .inspector
            .sample(input.table_name.trim(), limit)
            .await?;
        Ok(QueryOutput::from_result(result, limit.min(self.max_rows)).with_warning(limit_warning))
    }
}

/// Clamp a requested sample size to `1..=MAX_SAMPLE_LIMIT`.
fn clamp_sample_limit(requested: u32) -> (u32, Option<String>) {
    if requested > MAX_SAMPLE_LIMIT {
        let warning = format!(
            "Requested limit {} exceeds maximum allowed ({}). Results capped to {} rows.",
            requested, MAX_SAMPLE_LIMIT, MAX_SAMPLE_LIMIT
        );
        (MAX_SAMPLE_LIMIT, Some(warning))
    } else {
        (requested.max(1), None)
    }
}
