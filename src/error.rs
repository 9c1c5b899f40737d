//! Error types for sql-template.
//!
//! Every public operation returns either a value or a [`DbError`]. Driver
//! failures are translated at the innermost call site with [`Translate`], tagged
//! with the [`ErrorKind`] of the step that failed, and keep the original failure
//! reachable through [`std::error::Error::source`].

use std::fmt;
use thiserror::Error;

/// Boxed error used as the cause of a [`DbError`].
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// The step of an operation that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// A connection could not be obtained from the provider.
    Acquire,
    /// Malformed SQL or a statement the driver refused to prepare.
    Prepare,
    /// Bad parameter index, missing parameter or unsupported value.
    Bind,
    /// Constraint violation, deadlock, connectivity loss during execution.
    Execute,
    /// Result shape mismatch while reading a cursor.
    Extract,
    /// Closing a statement, cursor or connection failed.
    Release,
    /// Begin, commit, rollback or isolation configuration failed.
    Transaction,
    /// Failure raised by caller code running inside the core.
    Application,
}

impl ErrorKind {
    /// Human readable name of the failed step.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Acquire => "connection acquisition",
            Self::Prepare => "statement preparation",
            Self::Bind => "parameter binding",
            Self::Execute => "statement execution",
            Self::Extract => "result extraction",
            Self::Release => "resource release",
            Self::Transaction => "transaction management",
            Self::Application => "application logic",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The single failure type of the crate.
///
/// Failures that happened while this one was already propagating (a statement
/// that could not be closed, a rollback that failed) are kept in
/// [`DbError::suppressed`] instead of replacing it.
#[derive(Error, Debug)]
#[error("{kind} failed: {source}")]
pub struct DbError {
    kind: ErrorKind,
    #[source]
    source: BoxError,
    /// e.g., "23505" for a unique violation
    sql_state: Option<String>,
    suggestion: Option<String>,
    suppressed: Vec<DbError>,
}

impl DbError {
    /// Create an error of the given kind wrapping `source`.
    pub fn new(kind: ErrorKind, source: impl Into<BoxError>) -> Self {
        Self {
            kind,
            source: source.into(),
            sql_state: None,
            suggestion: None,
            suppressed: Vec::new(),
        }
    }

    /// Create a connection acquisition error.
    pub fn acquire(source: impl Into<BoxError>) -> Self {
        Self::new(ErrorKind::Acquire, source)
    }

    /// Create a statement preparation error.
    pub fn prepare(source: impl Into<BoxError>) -> Self {
        Self::new(ErrorKind::Prepare, source)
    }

    /// Create a parameter binding error.
    pub fn bind(source: impl Into<BoxError>) -> Self {
        Self::new(ErrorKind::Bind, source)
    }

    /// Create a statement execution error.
    pub fn execute(source: impl Into<BoxError>) -> Self {
        Self::new(ErrorKind::Execute, source)
    }

    /// Create a result extraction error.
    pub fn extract(source: impl Into<BoxError>) -> Self {
        Self::new(ErrorKind::Extract, source)
    }

    /// Create a resource release error.
    pub fn release(source: impl Into<BoxError>) -> Self {
        Self::new(ErrorKind::Release, source)
    }

    /// Create a transaction management error.
    pub fn transaction(source: impl Into<BoxError>) -> Self {
        Self::new(ErrorKind::Transaction, source)
    }

    /// Create an error for a failure raised by caller code.
    pub fn application(source: impl Into<BoxError>) -> Self {
        Self::new(ErrorKind::Application, source)
    }

    /// Translate a sqlx error, keeping its SQLSTATE when the database reported one.
    pub fn from_sqlx(kind: ErrorKind, err: sqlx::Error) -> Self {
        let sql_state = match &err {
            sqlx::Error::Database(db_err) => db_err.code().map(|c| c.to_string()),
            _ => None,
        };
        let mut error = Self::new(kind, err);
        error.sql_state = sql_state;
        error
    }

    /// Attach a hint for the caller.
    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }

    /// Attach a secondary failure that occurred while this one was propagating.
    pub fn with_suppressed(mut self, other: DbError) -> Self {
        self.suppressed.push(other);
        self
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn sql_state(&self) -> Option<&str> {
        self.sql_state.as_deref()
    }

    pub fn suggestion(&self) -> Option<&str> {
        self.suggestion.as_deref()
    }

    pub fn suppressed(&self) -> &[DbError] {
        &self.suppressed
    }

    /// The wrapped driver or application failure.
    pub fn cause(&self) -> &(dyn std::error::Error + Send + Sync + 'static) {
        self.source.as_ref()
    }

    /// Check if this error is retryable.
    ///
    /// Nothing in this crate retries; the hint is for layers above.
    pub fn is_retryable(&self) -> bool {
        if self.kind == ErrorKind::Acquire {
            return true;
        }
        matches!(
            self.source.downcast_ref::<sqlx::Error>(),
            Some(sqlx::Error::PoolTimedOut | sqlx::Error::Io(_))
        )
    }
}

/// Convert sqlx errors to DbError, choosing the kind from the variant.
///
/// Used by `?` inside caller-supplied extractors. Core code translates with an
/// explicit kind through [`Translate`].
impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        let (kind, suggestion) = match &err {
            sqlx::Error::Configuration(_) => (
                ErrorKind::Acquire,
                Some("Check the connection string format and credentials"),
            ),
            sqlx::Error::PoolTimedOut => (
                ErrorKind::Acquire,
                Some("Increase acquire_timeout or max_connections"),
            ),
            sqlx::Error::PoolClosed => (ErrorKind::Acquire, Some("Reconnect to the database")),
            sqlx::Error::Tls(_) => (
                ErrorKind::Acquire,
                Some("Verify TLS configuration and certificates"),
            ),
            sqlx::Error::Io(_) => (
                ErrorKind::Execute,
                Some("Check network connectivity and database server status"),
            ),
            sqlx::Error::Database(_) => (
                ErrorKind::Execute,
                Some("Check the SQL syntax and referenced objects"),
            ),
            sqlx::Error::RowNotFound => (
                ErrorKind::Extract,
                Some("Verify the query conditions match existing data"),
            ),
            sqlx::Error::TypeNotFound { .. }
            | sqlx::Error::ColumnNotFound(_)
            | sqlx::Error::ColumnIndexOutOfBounds { .. }
            | sqlx::Error::ColumnDecode { .. }
            | sqlx::Error::Decode(_) => (ErrorKind::Extract, None),
            _ => (ErrorKind::Execute, None),
        };
        let error = Self::from_sqlx(kind, err);
        match suggestion {
            Some(s) => error.with_suggestion(s),
            None => error,
        }
    }
}

/// Result type alias for database operations.
pub type DbResult<T> = Result<T, DbError>;

/// Translation of driver results into [`DbResult`] at the call site.
pub trait Translate<T> {
    fn translate(self, kind: ErrorKind) -> DbResult<T>;
}

impl<T> Translate<T> for Result<T, sqlx::Error> {
    fn translate(self, kind: ErrorKind) -> DbResult<T> {
        self.map_err(|e| DbError::from_sqlx(kind, e))
    }
}
