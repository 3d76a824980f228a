//! Error types for the query gate.
//!
//! Every failure a caller can observe is one of four kinds: a bad setup
//! (`Configuration`), a statement refused before it reached the engine
//! (`PolicyViolation`), an engine-side failure (`Query`), or a missing or
//! exhausted connection (`Connection`). Messages are written to be actionable
//! by an AI assistant reading them back.

use std::time::Duration;
use thiserror::Error;

/// Sub-classification of [`DbError::Query`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryErrorKind {
    /// Syntax, constraint or runtime error reported by the engine.
    Engine,
    /// The statement exceeded the configured command timeout.
    Timeout,
    /// A statement reached an execution path that does not match its classification.
    Misrouted,
    /// The referenced table does not exist.
    NotFound,
}

impl std::fmt::Display for QueryErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Engine => write!(f, "engine"),
            Self::Timeout => write!(f, "timeout"),
            Self::Misrouted => write!(f, "misrouted"),
            Self::NotFound => write!(f, "not_found"),
        }
    }
}

#[derive(Error, Debug)]
pub enum DbError {
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Policy violation: {operation} - {reason}")]
    PolicyViolation { operation: String, reason: String },

    #[error("Query failed ({kind}): {message}")]
    Query {
        kind: QueryErrorKind,
        message: String,
        /// e.g., "42P01" for undefined table
        sql_state: Option<String>,
    },

    #[error("Connection failed: {message}")]
    Connection { message: String, suggestion: String },
}

impl DbError {
    /// Create a configuration error.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Create a policy violation.
    pub fn policy(operation: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::PolicyViolation {
            operation: operation.into(),
            reason: reason.into(),
        }
    }

    /// Create an engine-reported query error with optional SQL state.
    pub fn query(message: impl Into<String>, sql_state: Option<String>) -> Self {
        Self::Query {
            kind: QueryErrorKind::Engine,
            message: message.into(),
            sql_state,
        }
    }

    /// Create a timeout error for an operation bounded by `limit`.
    pub fn timeout(operation: &str, limit: Duration) -> Self {
        Self::Query {
            kind: QueryErrorKind::Timeout,
            message: format!("{} exceeded {}s", operation, limit.as_secs()),
            sql_state: None,
        }
    }

    /// Create a misrouting error.
    pub fn misrouted(message: impl Into<String>) -> Self {
        Self::Query {
            kind: QueryErrorKind::Misrouted,
            message: message.into(),
            sql_state: None,
        }
    }

    /// Create a table-not-found error.
    pub fn table_not_found(table_name: &str) -> Self {
        Self::Query {
            kind: QueryErrorKind::NotFound,
            message: format!("Table '{}' not found", table_name),
            sql_state: None,
        }
    }

    /// Create a connection error with a helpful suggestion.
    pub fn connection(message: impl Into<String>, suggestion: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
            suggestion: suggestion.into(),
        }
    }

    /// Get the suggestion for this error, if available.
    pub fn suggestion(&self) -> Option<&str> {
        match self {
            Self::Connection { suggestion, .. } => Some(suggestion),
            Self::PolicyViolation { .. } => {
                Some("Set DB_READ_ONLY=false to allow writes, and use execute_query for SELECT")
            }
            Self::Query {
                kind: QueryErrorKind::Timeout,
                ..
            } => Some("Narrow the query or raise DB_COMMAND_TIMEOUT"),
            Self::Query {
                kind: QueryErrorKind::NotFound,
                ..
            } => Some("Call list_tables to see the available tables"),
            Self::Query { .. } => Some("Check the SQL syntax and referenced objects"),
            Self::Configuration { .. } => {
                Some("Check DB_TYPE and DATABASE_URL (or DATABASE_CONNECTION_STRING)")
            }
        }
    }

    /// Check if this error is a statement timeout.
    pub fn is_timeout(&self) -> bool {
        matches!(
            self,
            Self::Query {
                kind: QueryErrorKind::Timeout,
                ..
            }
        )
    }

    /// Check if this error is retryable.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Connection { .. }) || self.is_timeout()
    }
}

/// Convert sqlx errors to DbError.
impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::Configuration(msg) => DbError::configuration(msg.to_string()),
            sqlx::Error::Database(db_err) => {
                let code = db_err.code().map(|c| c.to_string());
                // 57014: query_canceled, raised by statement_timeout
                if code.as_deref() == Some("57014") {
                    return DbError::Query {
                        kind: QueryErrorKind::Timeout,
                        message: db_err.message().to_string(),
                        sql_state: code,
                    };
                }
                DbError::query(db_err.message(), code)
            }
            sqlx::Error::RowNotFound => DbError::query("No rows returned", None),
            sqlx::Error::PoolTimedOut => DbError::connection(
                "Connection pool exhausted: no connection became available in time",
                "Retry later or raise DB_POOL_MAX",
            ),
            sqlx::Error::PoolClosed => {
                DbError::connection("Connection pool is closed", "Restart the server")
            }
            sqlx::Error::Io(io_err) => DbError::connection(
                format!("I/O error: {}", io_err),
                "Check network connectivity and database server status",
            ),
            sqlx::Error::Tls(tls_err) => DbError::connection(
                format!("TLS error: {}", tls_err),
                "Verify TLS configuration and certificates",
            ),
            sqlx::Error::Protocol(msg) => DbError::connection(
                format!("Protocol error: {}", msg),
                "Check database server compatibility",
            ),
            sqlx::Error::WorkerCrashed => DbError::connection(
                "Database worker crashed",
                "Retry the operation; the connection was discarded",
            ),
            sqlx::Error::ColumnNotFound(col) => {
                DbError::query(format!("Column not found: {}", col), None)
            }
            sqlx::Error::ColumnIndexOutOfBounds { index, len } => DbError::query(
                format!("Column index {} out of bounds (len: {})", index, len),
                None,
            ),
            sqlx::Error::ColumnDecode { index, source } => DbError::query(
                format!("Failed to decode column {}: {}", index, source),
                None,
            ),
            sqlx::Error::Decode(source) => {
                DbError::query(format!("Decode error: {}", source), None)
            }
            _ => DbError::query(format!("Unknown database error: {}", err), None),
        }
    }
}

/// Result type alias for database operations.
pub type DbResult<T> = Result<T, DbError>;

/// Build suggestion data as JSON value.
fn suggestion_data(suggestion: Option<&str>) -> Option<serde_json::Value> {
    suggestion.map(|s| serde_json::json!({ "suggestion": s }))
}

/// Convert DbError to MCP ErrorData for semantic error categorization.
impl From<DbError> for rmcp::ErrorData {
    fn from(err: DbError) -> Self {
        let data = suggestion_data(err.suggestion());
        match &err {
            DbError::PolicyViolation { .. } => rmcp::ErrorData::invalid_params(err.to_string(), data),
            DbError::Query { kind, .. } if *kind != QueryErrorKind::Timeout => {
                rmcp::ErrorData::invalid_params(err.to_string(), data)
            }
            DbError::Query { .. } | DbError::Connection { .. } | DbError::Configuration { .. } => {
                rmcp::ErrorData::internal_error(err.to_string(), data)
            }
        }
    }
}
