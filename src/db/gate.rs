//! Query gate: classification, policy enforcement and routing.
//!
//! Every statement is classified by its leading keyword. Only statements that
//! begin with `SELECT` are reads; everything else, DDL included, is a write
//! and is refused under a read-only policy. Text holding more than one
//! statement is always a write, whatever it starts with.

use crate::db::adapter::EngineAdapter;
use crate::db::coerce;
use crate::db::pool::ConnectionManager;
use crate::error::{DbError, DbResult};
use crate::models::{Policy, QueryResult, RawRows, Statement, WriteResult};
use std::sync::Arc;
use sqlparser::dialect::GenericDialect;
use sqlparser::tokenizer::{Token, Tokenizer};
use std::time::Instant;
use tracing::{debug, info};

/// Read/write classification of a statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    Read,
    Write,
}

impl std::fmt::Display for Classification {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Read => write!(f, "READ"),
            Self::Write => write!(f, "WRITE"),
        }
    }
}

/// Classify statement text by its leading keyword.
pub fn classify(text: &str) -> Classification {
    let head = text.trim_start();
    match head.get(..6) {
        Some(prefix) if prefix.eq_ignore_ascii_case("SELECT") && !is_batch(head) => {
            Classification::Read
        }
        _ => Classification::Write,
    }
}

/// Whether `text` holds more than one statement.
///
/// Semicolons inside literals, quoted identifiers and comments do not count,
/// and a single trailing `;` is allowed. Text the tokenizer rejects is
/// treated as a batch.
fn is_batch(text: &str) -> bool {
    let dialect = GenericDialect {};
    let tokens = match Tokenizer::new(&dialect, text).tokenize() {
        Ok(tokens) => tokens,
        Err(e) => {
            debug!(error = %e, "Statement could not be tokenized");
            return true;
        }
    };

    let mut terminated = false;
    for token in &tokens {
        match token {
            Token::Whitespace(_) | Token::EOF => {}
            Token::SemiColon => terminated = true,
            _ if terminated => return true,
            _ => {}
        }
    }
    false
}

/// Refuse writes under a read-only policy.
pub fn authorize(classification: Classification, policy: &Policy) -> DbResult<()> {
    if classification == Classification::Write && policy.read_only {
        return Err(DbError::policy(
            "write",
            "server is in read-only mode; write statements are rejected",
        ));
    }
    Ok(())
}

/// Outcome of [`route`].
#[derive(Debug, Clone, PartialEq)]
pub enum Routed {
    Read(RawRows),
    Write(WriteResult),
}

/// Dispatch a statement to the adapter's read or write path.
pub async fn route<A: EngineAdapter>(
    adapter: &mut A,
    statement: &Statement,
    classification: Classification,
    fetch_limit: usize,
) -> DbResult<Routed> {
    match classification {
        Classification::Read => read_path(adapter, statement, fetch_limit)
            .await
            .map(Routed::Read),
        Classification::Write => write_path(adapter, statement).await.map(Routed::Write),
    }
}

/// Run a statement on the read path, refusing anything not classified READ.
pub async fn read_path<A: EngineAdapter>(
    adapter: &mut A,
    statement: &Statement,
    fetch_limit: usize,
) -> DbResult<RawRows> {
    ensure_classified(statement, Classification::Read)?;
    adapter.execute_read(statement, fetch_limit).await
}

/// Run a statement on the write path, refusing anything not classified WRITE.
pub async fn write_path<A: EngineAdapter>(
    adapter: &mut A,
    statement: &Statement,
) -> DbResult<WriteResult> {
    ensure_classified(statement, Classification::Write)?;
    adapter.execute_write(statement).await
}

fn ensure_classified(statement: &Statement, expected: Classification) -> DbResult<()> {
    let actual = classify(&statement.text);
    if actual != expected {
        return Err(DbError::misrouted(format!(
            "{} statement sent to the {} path",
            actual,
            expected.to_string().to_lowercase()
        )));
    }
    Ok(())
}

/// Entry point for caller-facing reads and writes.
///
/// Policy is copied once per call at entry; the connection is acquired only
/// after the statement has passed the gate and is released before returning.
#[derive(Debug, Clone)]
pub struct QueryGate {
    manager: Arc<ConnectionManager>,
}

impl QueryGate {
    pub fn new(manager: Arc<ConnectionManager>) -> Self {
        Self { manager }
    }

    pub fn manager(&self) -> &Arc<ConnectionManager> {
        &self.manager
    }

    /// Run a SELECT, bounded by the policy's `max_rows`.
    pub async fn execute_query(&self, statement: &Statement) -> DbResult<QueryResult> {
        let policy = self.manager.policy();
        self.read_bounded(statement, &policy, policy.max_rows).await
    }

    /// Run a SELECT bounded by `ceiling`, itself capped at `max_rows`.
    pub async fn execute_query_capped(
        &self,
        statement: &Statement,
        ceiling: u32,
    ) -> DbResult<QueryResult> {
        let policy = self.manager.policy();
        self.read_bounded(statement, &policy, ceiling.min(policy.max_rows))
            .await
    }

    async fn read_bounded(
        &self,
        statement: &Statement,
        policy: &Policy,
        ceiling: u32,
    ) -> DbResult<QueryResult> {
        let classification = classify(&statement.text);
        authorize(classification, policy)?;
        if classification != Classification::Read {
            return Err(DbError::policy(
                "execute_query",
                "only SELECT statements are accepted; use execute_write for modifications",
            ));
        }

        debug!(
            sql = %statement.text,
            params = statement.params.len(),
            ceiling = ceiling,
            "Executing query"
        );
        let start = Instant::now();

        let mut handle = self.manager.acquire().await?;
        let outcome = read_path(&mut handle, statement, coerce::fetch_limit(ceiling)).await;
        handle.release().await;

        let result = coerce::truncate(outcome?, ceiling);
        info!(
            engine = %self.manager.engine(),
            row_count = result.row_count(),
            truncated = result.truncated,
            execution_time_ms = start.elapsed().as_millis() as u64,
            "Query executed"
        );
        Ok(result)
    }

    /// Run a mutating statement.
    ///
    /// Refused outright under a read-only policy, whatever the text.
    pub async fn execute_write(&self, statement: &Statement) -> DbResult<WriteResult> {
        let policy = self.manager.policy();
        if policy.read_only {
            return Err(DbError::policy(
                "execute_write",
                "server is in read-only mode; set DB_READ_ONLY=false to enable writes",
            ));
        }

        let classification = classify(&statement.text);
        if classification == Classification::Read {
            return Err(DbError::policy(
                "execute_write",
                "use execute_query for SELECT statements",
            ));
        }
        authorize(classification, &policy)?;

        debug!(
            sql = %statement.text,
            params = statement.params.len(),
            "Executing write operation"
        );
        let start = Instant::now();

        let mut handle = self.manager.acquire().await?;
        let outcome = route(&mut handle, statement, classification, 0).await;
        handle.release().await;

        let result = match outcome? {
            Routed::Write(result) => result,
            Routed::Read(_) => {
                return Err(DbError::misrouted("write statement returned rows"));
            }
        };
        info!(
            engine = %self.manager.engine(),
            rows_affected = result.rows_affected,
            generated_id = ?result.generated_id,
            execution_time_ms = start.elapsed().as_millis() as u64,
            "Write executed"
        );
        Ok(result)
    }
}
