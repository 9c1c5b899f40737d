//! Transaction demarcation.
//!
//! [`run_in_transaction`] runs an action on a connection inside one explicit
//! transaction: the isolation level and read-only hint are applied, auto-commit
//! is switched off, and the action is committed on success or rolled back on
//! any failure. [`transactional`] turns an action into a decorated one for
//! [`PooledOperations::execute_decorated`](crate::db::PooledOperations::execute_decorated).
//!
//! Auto-commit and read-only are left as the transaction set them. Restoring
//! them is the job of the connection provider when the connection is released.

use crate::db::driver::Connection;
use crate::db::executor::finish;
use crate::error::{DbError, DbResult};
use std::fmt;
use std::str::FromStr;
use tracing::{debug, warn};

/// The classical transaction isolation levels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IsolationLevel {
    /// Transactions are not supported.
    None,
    ReadUncommitted,
    ReadCommitted,
    RepeatableRead,
    Serializable,
}

impl IsolationLevel {
    pub const ALL: [IsolationLevel; 5] = [
        Self::None,
        Self::ReadUncommitted,
        Self::ReadCommitted,
        Self::RepeatableRead,
        Self::Serializable,
    ];

    /// Numeric constant exchanged with the driver.
    pub fn constant(self) -> i32 {
        match self {
            Self::None => 0,
            Self::ReadUncommitted => 1,
            Self::ReadCommitted => 2,
            Self::RepeatableRead => 4,
            Self::Serializable => 8,
        }
    }

    /// Map a driver-reported constant back to a level.
    pub fn from_constant(constant: i32) -> DbResult<Self> {
        Self::ALL
            .into_iter()
            .find(|level| level.constant() == constant)
            .ok_or_else(|| {
                DbError::transaction(format!("unrecognized isolation level constant {constant}"))
            })
    }

    /// SQL spelling used in `SET TRANSACTION` / `BEGIN` statements.
    pub fn sql_name(self) -> Option<&'static str> {
        match self {
            Self::None => None,
            Self::ReadUncommitted => Some("READ UNCOMMITTED"),
            Self::ReadCommitted => Some("READ COMMITTED"),
            Self::RepeatableRead => Some("REPEATABLE READ"),
            Self::Serializable => Some("SERIALIZABLE"),
        }
    }

    fn as_str(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::ReadUncommitted => "read-uncommitted",
            Self::ReadCommitted => "read-committed",
            Self::RepeatableRead => "repeatable-read",
            Self::Serializable => "serializable",
        }
    }
}

impl fmt::Display for IsolationLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for IsolationLevel {
    type Err = DbError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace(['_', ' '], "-");
        Self::ALL
            .into_iter()
            .find(|level| level.as_str() == normalized)
            .ok_or_else(|| DbError::transaction(format!("unknown isolation level: {s}")))
    }
}

/// Isolation level plus read-only flag requested for one transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TransactionConfig {
    isolation_level: IsolationLevel,
    read_only: bool,
}

impl TransactionConfig {
    pub const NONE: Self = Self::new(IsolationLevel::None);
    pub const READ_UNCOMMITTED: Self = Self::new(IsolationLevel::ReadUncommitted);
    pub const READ_COMMITTED: Self = Self::new(IsolationLevel::ReadCommitted);
    pub const REPEATABLE_READ: Self = Self::new(IsolationLevel::RepeatableRead);
    pub const SERIALIZABLE: Self = Self::new(IsolationLevel::Serializable);

    /// A read-write configuration at `isolation_level`.
    pub const fn new(isolation_level: IsolationLevel) -> Self {
        Self {
            isolation_level,
            read_only: false,
        }
    }

    /// The same configuration with the read-only hint set.
    pub const fn read_only(self) -> Self {
        Self {
            isolation_level: self.isolation_level,
            read_only: true,
        }
    }

    pub fn isolation_level(&self) -> IsolationLevel {
        self.isolation_level
    }

    pub fn is_read_only(&self) -> bool {
        self.read_only
    }
}

impl fmt::Display for TransactionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.read_only {
            write!(f, "{} (read-only)", self.isolation_level)
        } else {
            write!(f, "{}", self.isolation_level)
        }
    }
}

/// The connection's current isolation level.
///
/// A constant that does not name a known level is an error rather than a
/// silent default.
pub fn isolation_level<C: Connection>(connection: &C) -> DbResult<IsolationLevel> {
    IsolationLevel::from_constant(connection.transaction_isolation()?)
}

/// Wrap `action` so that it runs inside a transaction configured by `config`.
pub fn transactional<C, R, F>(
    config: TransactionConfig,
    action: F,
) -> impl FnOnce(&mut C) -> DbResult<R>
where
    C: Connection,
    F: FnOnce(&mut C) -> DbResult<R>,
{
    move |connection: &mut C| run_in_transaction(config, connection, action)
}

/// Run `action` on `connection` inside a transaction configured by `config`.
///
/// Commit and rollback are each attempted at most once. When the action or
/// the commit fails the connection is rolled back and that failure is
/// returned, carrying a failed rollback as a suppressed error.
///
/// The connection's auto-commit mode is put back the way it was found once
/// the transaction ends, so later statements on the same connection are not
/// left inside an implicit transaction.
pub fn run_in_transaction<C, R>(
    config: TransactionConfig,
    connection: &mut C,
    action: impl FnOnce(&mut C) -> DbResult<R>,
) -> DbResult<R>
where
    C: Connection,
{
    let level = config.isolation_level();
    let read_only = config.is_read_only();
    let auto_commit = connection.auto_commit();

    connection.set_transaction_isolation(level.constant())?;
    if let Err(e) = connection.set_read_only(read_only) {
        warn!(error = %e, read_only, "Read-only hint rejected by driver, continuing");
    }
    connection.set_auto_commit(false)?;
    debug!(isolation = %level, read_only, "Transaction started");

    let outcome = match action(connection) {
        Ok(value) => match connection.commit() {
            Ok(()) => {
                debug!("Transaction committed");
                return finish(Ok(value), restore_auto_commit(connection, auto_commit));
            }
            Err(e) => e,
        },
        Err(e) => e,
    };
    Err(roll_back(connection, outcome, auto_commit))
}

fn roll_back<C: Connection>(connection: &mut C, error: DbError, auto_commit: bool) -> DbError {
    match connection.rollback() {
        Ok(()) => {
            debug!(error = %error, "Transaction rolled back");
            match restore_auto_commit(connection, auto_commit) {
                Ok(()) => error,
                Err(restore_error) => error.with_suppressed(restore_error),
            }
        }
        // The transaction may still be open; the provider discards it on release
        Err(rollback_error) => {
            warn!(
                error = %error,
                rollback_error = %rollback_error,
                "Rollback failed"
            );
            error.with_suppressed(rollback_error)
        }
    }
}

fn restore_auto_commit<C: Connection>(connection: &mut C, auto_commit: bool) -> DbResult<()> {
    if connection.auto_commit() == auto_commit {
        return Ok(());
    }
    connection.set_auto_commit(auto_commit).inspect_err(|e| {
        warn!(error = %e, auto_commit, "Failed to restore auto-commit");
    })
}
