//! Schema introspection.
//!
//! Built on the [`QueryGate`]: catalog queries run on a connection acquired
//! from the same manager, and sampling goes through the ordinary read path.
//! Table names are interpolated into `COUNT(*)` and sampling statements as-is
//! and must come from a trusted source.

use crate::db::adapter::EngineAdapter;
use crate::db::coerce;
use crate::db::gate::{self, QueryGate};
use crate::db::pool::ConnectionHandle;
use crate::error::{DbError, DbResult};
use crate::models::{QueryResult, Statement, TableDescriptor, TableEntry};
use serde_json::Value as JsonValue;
use tracing::{debug, info};

/// Default number of rows returned by [`SchemaInspector::sample`].
pub const DEFAULT_SAMPLE_LIMIT: u32 = 5;

/// Schema inspector for catalog queries and table sampling.
#[derive(Debug, Clone)]
pub struct SchemaInspector {
    gate: QueryGate,
}

impl SchemaInspector {
    pub fn new(gate: QueryGate) -> Self {
        Self { gate }
    }

    /// List user tables and views.
    pub async fn list_tables(&self) -> DbResult<Vec<TableEntry>> {
        let mut handle = self.gate.manager().acquire().await?;
        let outcome = handle.list_tables().await;
        handle.release().await;

        let tables = outcome?;
        info!(count = tables.len(), "Tables listed");
        Ok(tables)
    }

    /// Describe a table: columns, primary key and row count.
    ///
    /// All three lookups share one connection.
    pub async fn describe_table(&self, table_name: &str) -> DbResult<TableDescriptor> {
        let mut handle = self.gate.manager().acquire().await?;
        let outcome = Self::describe_on(&mut handle, table_name).await;
        handle.release().await;

        let table = outcome?;
        info!(
            table = %table.name,
            columns = table.columns.len(),
            primary_key = ?table.primary_key(),
            row_count = table.row_count,
            "Table described"
        );
        Ok(table)
    }

    async fn describe_on(
        handle: &mut ConnectionHandle,
        table_name: &str,
    ) -> DbResult<TableDescriptor> {
        let raw_columns = handle.describe_columns(table_name).await?;
        if raw_columns.is_empty() {
            return Err(DbError::table_not_found(table_name));
        }

        let primary_key = handle.primary_key_columns(table_name).await?;
        let columns = coerce::normalize_columns(raw_columns, primary_key.as_deref());

        let count_statement = Statement::new(format!("SELECT COUNT(*) AS count FROM {}", table_name));
        let counted = gate::read_path(handle, &count_statement, 1).await?;
        let row_count = counted
            .rows
            .first()
            .and_then(|row| row.get("count"))
            .and_then(count_value)
            .unwrap_or(0);

        debug!(table = %table_name, row_count = row_count, "Counted rows");
        Ok(TableDescriptor {
            name: table_name.to_string(),
            columns,
            row_count,
        })
    }

    /// Return up to `min(limit, max_rows)` rows from a table.
    pub async fn sample(&self, table_name: &str, limit: u32) -> DbResult<QueryResult> {
        let ceiling = limit.min(self.gate.manager().policy().max_rows);
        let statement = Statement::new(format!(
            "SELECT * FROM {} LIMIT {}",
            table_name,
            u64::from(ceiling) + 1
        ));
        self.gate.execute_query_capped(&statement, ceiling).await
    }
}

/// COUNT(*) comes back as an integer on both engines, but tolerate a string.
fn count_value(value: &JsonValue) -> Option<u64> {
    match value {
        JsonValue::Number(n) => n.as_u64(),
        JsonValue::String(s) => s.parse().ok(),
        _ => None,
    }
}
