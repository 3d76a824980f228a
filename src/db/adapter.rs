//! Engine capability interface.
//!
//! Both engines expose the same operations on a live, exclusively owned
//! connection. Callers hold an adapter only for the duration of one logical
//! call; see [`crate::db::pool::ConnectionManager::acquire`].

use crate::db::types::RowToJson;
use crate::error::{DbError, DbResult};
use crate::models::{EngineKind, RawColumn, RawRows, Statement, TableEntry, WriteResult};
use sqlx::Column;
use std::future::Future;
use std::time::Duration;
use tokio::time::timeout;

/// Operations every engine adapter provides on its live connection.
pub trait EngineAdapter: Send {
    /// Engine this adapter talks to.
    fn engine(&self) -> EngineKind;

    /// Run a read statement and return at most `fetch_limit` rows.
    ///
    /// The gate asks for one row more than the ceiling so truncation can be
    /// detected without counting.
    fn execute_read(
        &mut self,
        statement: &Statement,
        fetch_limit: usize,
    ) -> impl Future<Output = DbResult<RawRows>> + Send;

    /// Run a mutating statement.
    fn execute_write(
        &mut self,
        statement: &Statement,
    ) -> impl Future<Output = DbResult<WriteResult>> + Send;

    /// User tables and views, ordered by name.
    fn list_tables(&mut self) -> impl Future<Output = DbResult<Vec<TableEntry>>> + Send;

    /// Column metadata for one table, in the engine's own shape.
    fn describe_columns(
        &mut self,
        table_name: &str,
    ) -> impl Future<Output = DbResult<Vec<RawColumn>>> + Send;

    /// Primary-key column names, for engines that do not embed the flag in
    /// column metadata. `None` means the flag is already in [`RawColumn`].
    fn primary_key_columns(
        &mut self,
        table_name: &str,
    ) -> impl Future<Output = DbResult<Option<Vec<String>>>> + Send;
}

/// Run `fut` under the command timeout, mapping expiry to a timeout error.
pub(crate) async fn with_timeout<T, F>(operation: &str, limit: Duration, fut: F) -> DbResult<T>
where
    F: Future<Output = Result<T, sqlx::Error>>,
{
    match timeout(limit, fut).await {
        Ok(result) => result.map_err(DbError::from),
        Err(_) => Err(DbError::timeout(operation, limit)),
    }
}

/// Collect streamed rows, stopping at the first error.
pub(crate) fn collect_rows<R>(results: Vec<Result<R, sqlx::Error>>) -> DbResult<Vec<R>> {
    let mut rows = Vec::with_capacity(results.len());
    for result in results {
        rows.push(result.map_err(DbError::from)?);
    }
    Ok(rows)
}

/// Pair decoded engine rows with the result's column names.
pub(crate) fn rows_to_raw<R: RowToJson>(rows: &[R], columns: Vec<String>) -> RawRows {
    RawRows {
        columns,
        rows: rows.iter().map(|r| r.to_json_map()).collect(),
    }
}

/// Column names declared by a prepared statement, in result order.
///
/// Used when a read returns no rows, so the names cannot come from a row.
pub(crate) fn statement_columns<'q, S: sqlx::Statement<'q>>(statement: &S) -> Vec<String> {
    statement
        .columns()
        .iter()
        .map(|column| column.name().to_string())
        .collect()
}
