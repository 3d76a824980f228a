//! Direct-connection adapter (SQLite).
//!
//! Every acquisition opens a brand-new `SqliteConnection`; nothing is pooled
//! or reused across calls. The connection is closed explicitly by
//! [`DirectAdapter::close`], or dropped (which also closes it) if the call
//! unwinds early.

use crate::db::adapter::{
    EngineAdapter, collect_rows, rows_to_raw, statement_columns, with_timeout,
};
use crate::db::types::RowToJson;
use crate::error::{DbError, DbResult};
use crate::models::{
    EngineConfig, EngineKind, QueryParam, RawColumn, RawRows, Statement, TableEntry, TableKind,
    WriteResult,
};
use futures_util::StreamExt;
use sqlx::sqlite::{SqliteArguments, SqliteConnectOptions, SqliteConnection};
use sqlx::{ConnectOptions, Connection, Executor, Row};
use std::str::FromStr;
use std::time::Duration;
use tokio::time::timeout;
use tracing::{debug, warn};

mod queries {
    pub const LIST_TABLES: &str = r#"
        SELECT name, type
        FROM sqlite_master
        WHERE type IN ('table', 'view')
          AND name NOT LIKE 'sqlite_%'
        ORDER BY name
    "#;

    pub const TABLE_INFO: &str = r#"
        SELECT name, type, "notnull" AS not_null, dflt_value, pk
        FROM pragma_table_info(?1)
        ORDER BY cid
    "#;
}

/// Connection settings for the direct engine, prepared once at `connect()`.
#[derive(Debug, Clone)]
pub struct DirectEngine {
    options: SqliteConnectOptions,
    command_timeout: Duration,
}

impl DirectEngine {
    /// Build connection options without opening anything.
    ///
    /// Accepts `sqlite:` URLs and plain file paths. Read-only policies open the
    /// file read-only; writable ones create it when missing.
    pub fn prepare(config: &EngineConfig) -> DbResult<Self> {
        let target = config.connection_target.trim();
        if target.is_empty() {
            return Err(DbError::configuration(
                "SQLite requires a database file path or sqlite: URL",
            ));
        }

        let options = if target.starts_with("sqlite:") {
            SqliteConnectOptions::from_str(target).map_err(|e| {
                DbError::configuration(format!("Invalid SQLite connection string: {}", e))
            })?
        } else {
            SqliteConnectOptions::new().filename(target)
        };

        let read_only = config.policy.read_only;
        let command_timeout = config.pool_options.command_timeout_or_default();
        let options = options
            .read_only(read_only)
            .create_if_missing(!read_only)
            .busy_timeout(command_timeout)
            .disable_statement_logging();

        Ok(Self {
            options,
            command_timeout,
        })
    }

    /// Open a fresh connection for one call.
    pub async fn open(&self) -> DbResult<DirectAdapter> {
        let conn = match timeout(
            self.command_timeout,
            SqliteConnection::connect_with(&self.options),
        )
        .await
        {
            Ok(Ok(conn)) => conn,
            Ok(Err(e)) => {
                return Err(DbError::connection(
                    format!("Failed to open SQLite database: {}", e),
                    "Verify the file path exists and is accessible; read-only mode never creates files",
                ));
            }
            Err(_) => {
                return Err(DbError::connection(
                    format!(
                        "Opening the SQLite database exceeded {}s",
                        self.command_timeout.as_secs()
                    ),
                    "Check whether another process holds a lock on the file",
                ));
            }
        };
        debug!("Opened direct SQLite connection");
        Ok(DirectAdapter {
            conn: Some(conn),
            command_timeout: self.command_timeout,
        })
    }
}

/// A live SQLite connection owned by exactly one call.
#[derive(Debug)]
pub struct DirectAdapter {
    conn: Option<SqliteConnection>,
    command_timeout: Duration,
}

impl DirectAdapter {
    fn conn(&mut self) -> DbResult<&mut SqliteConnection> {
        self.conn.as_mut().ok_or_else(|| {
            DbError::connection(
                "SQLite connection already closed",
                "Acquire a new connection for each call",
            )
        })
    }

    /// Result column names of `sql`, read from the prepared statement.
    async fn result_columns(&mut self, sql: &str) -> DbResult<Vec<String>> {
        let command_timeout = self.command_timeout;
        let conn = self.conn()?;
        let prepared = with_timeout("describe result", command_timeout, conn.prepare(sql)).await?;
        Ok(statement_columns(&prepared))
    }

    /// Close the connection, waiting at most the command timeout.
    ///
    /// A statement abandoned by a timeout may still be running on the worker
    /// thread; in that case the connection is dropped instead of awaited.
    pub async fn close(mut self) {
        let Some(conn) = self.conn.take() else {
            return;
        };
        match timeout(self.command_timeout, conn.close()).await {
            Ok(Ok(())) => debug!("Closed direct SQLite connection"),
            Ok(Err(e)) => warn!(error = %e, "Error while closing SQLite connection"),
            Err(_) => warn!("Closing SQLite connection timed out, dropping it"),
        }
    }
}

impl Drop for DirectAdapter {
    fn drop(&mut self) {
        if self.conn.take().is_some() {
            debug!("SQLite connection closed via Drop");
        }
    }
}

fn bind_param<'q>(
    query: sqlx::query::Query<'q, sqlx::Sqlite, SqliteArguments<'q>>,
    param: &'q QueryParam,
) -> sqlx::query::Query<'q, sqlx::Sqlite, SqliteArguments<'q>> {
    match param {
        QueryParam::Null => query.bind(None::<String>),
        QueryParam::Bool(v) => query.bind(*v),
        QueryParam::Int(v) => query.bind(*v),
        QueryParam::Float(v) => query.bind(*v),
        QueryParam::String(v) => query.bind(v.as_str()),
    }
}

impl EngineAdapter for DirectAdapter {
    fn engine(&self) -> EngineKind {
        EngineKind::Sqlite
    }

    async fn execute_read(&mut self, statement: &Statement, fetch_limit: usize) -> DbResult<RawRows> {
        let command_timeout = self.command_timeout;
        let sql = statement.text.as_str();
        let results = {
            let conn = self.conn()?;
            let mut query = sqlx::query(sql);
            for param in &statement.params {
                query = bind_param(query, param);
            }
            let rows_future = query.fetch(conn).take(fetch_limit).collect::<Vec<_>>();
            match timeout(command_timeout, rows_future).await {
                Ok(results) => results,
                Err(_) => return Err(DbError::timeout("query execution", command_timeout)),
            }
        };
        let rows = collect_rows(results)?;

        let columns = match rows.first() {
            Some(row) => row.column_names(),
            None => self.result_columns(sql).await?,
        };
        Ok(rows_to_raw(&rows, columns))
    }

    async fn execute_write(&mut self, statement: &Statement) -> DbResult<WriteResult> {
        let command_timeout = self.command_timeout;
        let conn = self.conn()?;
        let sql = statement.text.as_str();

        let mut query = sqlx::query(sql);
        for param in &statement.params {
            query = bind_param(query, param);
        }
        let result = with_timeout("write operation", command_timeout, query.execute(conn)).await?;

        // Fresh connections start at rowid 0, so 0 means nothing was inserted.
        let generated_id = Some(result.last_insert_rowid()).filter(|id| *id != 0);
        Ok(WriteResult {
            rows_affected: result.rows_affected(),
            generated_id,
        })
    }

    async fn list_tables(&mut self) -> DbResult<Vec<TableEntry>> {
        let command_timeout = self.command_timeout;
        let conn = self.conn()?;
        let rows = with_timeout(
            "list tables",
            command_timeout,
            sqlx::query(queries::LIST_TABLES).fetch_all(conn),
        )
        .await?;

        let tables = rows
            .iter()
            .map(|row| {
                let name: String = row.try_get("name")?;
                let kind: String = row.try_get("type")?;
                Ok(TableEntry::new(name, TableKind::parse(&kind)))
            })
            .collect::<Result<Vec<_>, sqlx::Error>>()?;

        debug!(count = tables.len(), "Listed SQLite tables");
        Ok(tables)
    }

    async fn describe_columns(&mut self, table_name: &str) -> DbResult<Vec<RawColumn>> {
        let command_timeout = self.command_timeout;
        let conn = self.conn()?;
        let rows = with_timeout(
            "describe table",
            command_timeout,
            sqlx::query(queries::TABLE_INFO)
                .bind(table_name)
                .fetch_all(conn),
        )
        .await?;

        let columns = rows
            .iter()
            .map(|row| {
                Ok(RawColumn::Pragma {
                    name: row.try_get("name")?,
                    declared_type: row.try_get::<Option<String>, _>("type")?.unwrap_or_default(),
                    not_null: row.try_get("not_null")?,
                    default_value: row.try_get("dflt_value")?,
                    pk: row.try_get("pk")?,
                })
            })
            .collect::<Result<Vec<_>, sqlx::Error>>()?;

        debug!(table = %table_name, columns = columns.len(), "Described SQLite table");
        Ok(columns)
    }

    async fn primary_key_columns(&mut self, _table_name: &str) -> DbResult<Option<Vec<String>>> {
        // pragma_table_info already carries the pk position
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Policy;
    use tempfile::NamedTempFile;

    fn engine_for(path: &str, read_only: bool) -> DirectEngine {
        let config = EngineConfig::new(EngineKind::Sqlite, path, Policy::new(read_only, 100));
        DirectEngine::prepare(&config).unwrap()
    }

    #[test]
    fn test_prepare_rejects_empty_target() {
        let config = EngineConfig::new(EngineKind::Sqlite, "  ", Policy::default());
        assert!(matches!(
            DirectEngine::prepare(&config),
            Err(DbError::Configuration { .. })
        ));
    }

    #[test]
    fn test_prepare_accepts_url_and_path() {
        engine_for("sqlite:data/shop.db", true);
        engine_for("data/shop.db", true);
    }

    #[tokio::test]
    async fn test_read_only_open_of_missing_file_is_connection_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing.db");
        let engine = engine_for(path.to_str().unwrap(), true);
        let result = engine.open().await;
        assert!(matches!(result, Err(DbError::Connection { .. })));
    }

    #[tokio::test]
    async fn test_write_then_read_on_fresh_connections() {
        let file = NamedTempFile::new().unwrap();
        let engine = engine_for(file.path().to_str().unwrap(), false);

        let mut adapter = engine.open().await.unwrap();
        adapter
            .execute_write(&Statement::new(
                "CREATE TABLE items (id INTEGER PRIMARY KEY, label TEXT NOT NULL)",
            ))
            .await
            .unwrap();
        adapter.close().await;

        let mut adapter = engine.open().await.unwrap();
        let written = adapter
            .execute_write(&Statement::new("INSERT INTO items (label) VALUES (?)").bind("bolt"))
            .await
            .unwrap();
        assert_eq!(written.rows_affected, 1);
        assert_eq!(written.generated_id, Some(1));
        adapter.close().await;

        let mut adapter = engine.open().await.unwrap();
        let raw = adapter
            .execute_read(&Statement::new("SELECT id, label FROM items"), 10)
            .await
            .unwrap();
        assert_eq!(raw.columns, vec!["id", "label"]);
        assert_eq!(raw.rows[0]["label"], serde_json::json!("bolt"));
        assert_eq!(raw.rows[0]["id"], serde_json::json!(1));
        adapter.close().await;
    }

    #[tokio::test]
    async fn test_update_reports_no_generated_id() {
        let file = NamedTempFile::new().unwrap();
        let engine = engine_for(file.path().to_str().unwrap(), false);
        let mut adapter = engine.open().await.unwrap();
        adapter
            .execute_write(&Statement::new("CREATE TABLE t (v INTEGER)"))
            .await
            .unwrap();
        adapter.close().await;

        let mut adapter = engine.open().await.unwrap();
        let result = adapter
            .execute_write(&Statement::new("UPDATE t SET v = 1"))
            .await
            .unwrap();
        assert_eq!(result.rows_affected, 0);
        assert_eq!(result.generated_id, None);
    }

    #[tokio::test]
    async fn test_empty_read_reports_declared_columns() {
        let file = NamedTempFile::new().unwrap();
        let engine = engine_for(file.path().to_str().unwrap(), false);
        let mut adapter = engine.open().await.unwrap();
        adapter
            .execute_write(&Statement::new("CREATE TABLE t (id INTEGER, label TEXT)"))
            .await
            .unwrap();

        let raw = adapter
            .execute_read(&Statement::new("SELECT label, id FROM t WHERE id = ?").bind(9_i64), 5)
            .await
            .unwrap();
        assert!(raw.rows.is_empty());
        assert_eq!(raw.columns, vec!["label", "id"]);
        adapter.close().await;
    }

    #[tokio::test]
    async fn test_fetch_limit_caps_streamed_rows() {
        let file = NamedTempFile::new().unwrap();
        let engine = engine_for(file.path().to_str().unwrap(), false);
        let mut adapter = engine.open().await.unwrap();
        let raw = adapter
            .execute_read(
                &Statement::new(
                    "WITH RECURSIVE n(x) AS (SELECT 1 UNION ALL SELECT x + 1 FROM n WHERE x < 50) SELECT x FROM n",
                ),
                7,
            )
            .await
            .unwrap();
        assert_eq!(raw.rows.len(), 7);
    }

    #[tokio::test]
    async fn test_close_is_safe_after_drop_path() {
        let file = NamedTempFile::new().unwrap();
        let engine = engine_for(file.path().to_str().unwrap(), false);
        let adapter = engine.open().await.unwrap();
        drop(adapter);
        let adapter = engine.open().await.unwrap();
        adapter.close().await;
    }
}
