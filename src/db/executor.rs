//! Connection-scoped statement execution.
//!
//! [`ConnectionOperations`] runs statements on a connection owned by the
//! caller. Every statement it prepares, and every cursor it opens, is closed
//! exactly once before the call returns, whatever the outcome.

use crate::db::driver::{Connection, Cursor, CursorOf, Statement};
use crate::db::row::{GeneratedKeyRow, collect_generated_keys};
use crate::error::DbResult;
use tracing::{debug, warn};

/// Combine an outcome with the outcome of releasing the resource that
/// produced it.
///
/// A release failure after success becomes the failure. A release failure
/// while another failure propagates is attached to it as suppressed.
pub(crate) fn finish<R>(result: DbResult<R>, released: DbResult<()>) -> DbResult<R> {
    match (result, released) {
        (Ok(value), Ok(())) => Ok(value),
        (Ok(_), Err(e)) => Err(e),
        (Err(e), Ok(())) => Err(e),
        (Err(e), Err(release_error)) => {
            warn!(
                error = %e,
                release_error = %release_error,
                "Release failed while another failure was propagating"
            );
            Err(e.with_suppressed(release_error))
        }
    }
}

/// Statement execution over a caller-owned connection.
pub struct ConnectionOperations<'c, C: Connection> {
    connection: &'c mut C,
}

impl<'c, C: Connection> ConnectionOperations<'c, C> {
    pub fn new(connection: &'c mut C) -> Self {
        Self { connection }
    }

    pub fn connection(&mut self) -> &mut C {
        &mut *self.connection
    }

    /// Prepare a statement with `prepare`, hand it to `run`, then close it.
    ///
    /// `prepare` only receives the connection already owned here; it must not
    /// acquire or release connections of its own.
    pub fn execute<'s, R>(
        &'s mut self,
        prepare: impl FnOnce(&'s mut C) -> DbResult<C::Statement<'s>>,
        run: impl FnOnce(&mut C::Statement<'s>) -> DbResult<R>,
    ) -> DbResult<R>
    where
        C: 's,
    {
        let mut statement = prepare(&mut *self.connection)?;
        let result = run(&mut statement);
        finish(result, statement.close())
    }

    /// Run a query and hand its cursor to `extract`.
    ///
    /// The cursor is closed before the statement. `extract` must consume what it
    /// needs before returning.
    pub fn query<'s, R>(
        &'s mut self,
        sql: &str,
        bind: impl FnOnce(&mut C::Statement<'s>) -> DbResult<()>,
        extract: impl FnOnce(&mut CursorOf<C>) -> DbResult<R>,
    ) -> DbResult<R>
    where
        C: 's,
    {
        debug!(sql, "Executing query");
        self.execute(
            |connection| connection.prepare(sql),
            |statement| {
                bind(statement)?;
                let mut cursor = statement.execute_query()?;
                let result = extract(&mut cursor);
                finish(result, cursor.close())
            },
        )
    }

    /// Execute a statement produced by `prepare` as an update.
    pub fn update_with<'s>(
        &'s mut self,
        prepare: impl FnOnce(&'s mut C) -> DbResult<C::Statement<'s>>,
    ) -> DbResult<u64>
    where
        C: 's,
    {
        self.execute(prepare, |statement| statement.execute_update())
    }

    /// Execute a data-modifying statement and return the affected row count.
    pub fn update<'s>(
        &'s mut self,
        sql: &str,
        bind: impl FnOnce(&mut C::Statement<'s>) -> DbResult<()>,
    ) -> DbResult<u64>
    where
        C: 's,
    {
        debug!(sql, "Executing update");
        self.execute(
            |connection| connection.prepare(sql),
            |statement| {
                bind(statement)?;
                statement.execute_update()
            },
        )
    }

    /// Execute an insert and read back the keys the driver generated for it,
    /// one row per inserted record in cursor order.
    pub fn update_returning_keys<'s>(
        &'s mut self,
        sql: &str,
        bind: impl FnOnce(&mut C::Statement<'s>) -> DbResult<()>,
    ) -> DbResult<Vec<GeneratedKeyRow>>
    where
        C: 's,
    {
        debug!(sql, "Executing update returning generated keys");
        self.execute(
            |connection| connection.prepare_returning_keys(sql),
            |statement| {
                bind(statement)?;
                let affected = statement.execute_update()?;
                let mut keys = statement.generated_keys()?;
                let result = collect_generated_keys(&mut keys);
                if let Ok(rows) = &result {
                    debug!(affected, keys = rows.len(), "Generated keys read");
                }
                finish(result, keys.close())
            },
        )
    }
}
