//! Driver seam: the connection, statement and cursor contracts the executors
//! are written against.
//!
//! A statement borrows its connection mutably and a cursor is owned by the
//! code that opened it, so the nesting connection ⊇ statement ⊇ cursor is
//! checked by the compiler. Parameter indexes are 1-based, column indexes are
//! 0-based.

use crate::error::{DbError, DbResult};
use crate::models::{FromSqlValue, SqlValue};
use std::collections::VecDeque;

/// Forward-only view over the rows produced by a statement.
pub trait Cursor {
    /// Column names in driver-reported order.
    fn column_names(&self) -> DbResult<Vec<String>>;

    /// Advance to the next row. Returns `false` once the rows are exhausted.
    fn next(&mut self) -> DbResult<bool>;

    /// Value of the current row at a 0-based column index.
    fn value(&self, index: usize) -> DbResult<SqlValue>;

    /// Value of the current row by column name, matched case-insensitively.
    fn value_by_name(&self, name: &str) -> DbResult<SqlValue> {
        let index = self
            .column_names()?
            .iter()
            .position(|column| column.eq_ignore_ascii_case(name))
            .ok_or_else(|| DbError::extract(format!("column not found: {name}")))?;
        self.value(index)
    }

    /// Typed read of a named column of the current row.
    fn get<T: FromSqlValue>(&self, name: &str) -> DbResult<T>
    where
        Self: Sized,
    {
        T::from_sql_value(self.value_by_name(name)?)
    }

    /// Release the cursor.
    fn close(self) -> DbResult<()>
    where
        Self: Sized;
}

/// A prepared statement bound to one connection.
pub trait Statement {
    type Cursor: Cursor;

    /// Bind a value to a 1-based parameter position.
    fn bind_value(&mut self, index: usize, value: SqlValue) -> DbResult<()>;

    fn bind(&mut self, index: usize, value: impl Into<SqlValue>) -> DbResult<()>
    where
        Self: Sized,
    {
        self.bind_value(index, value.into())
    }

    /// Execute a data-modifying statement and return the affected row count.
    fn execute_update(&mut self) -> DbResult<u64>;

    /// Execute a query and open a cursor over its rows.
    fn execute_query(&mut self) -> DbResult<Self::Cursor>;

    /// Keys generated by the last `execute_update`. Only available for
    /// statements prepared with [`Connection::prepare_returning_keys`].
    fn generated_keys(&mut self) -> DbResult<Self::Cursor>;

    /// Release the statement.
    fn close(self) -> DbResult<()>
    where
        Self: Sized;
}

/// One database session.
///
/// Isolation levels cross this seam as the classical numeric constants so that
/// a driver reporting an unknown level is detected by the caller.
pub trait Connection {
    /// Cursor type shared by every statement of this connection.
    type Cursor: Cursor;

    type Statement<'c>: Statement<Cursor = Self::Cursor>
    where
        Self: 'c;

    fn prepare<'c>(&'c mut self, sql: &str) -> DbResult<Self::Statement<'c>>;

    /// Prepare a statement whose generated keys can be read after execution.
    fn prepare_returning_keys<'c>(&'c mut self, sql: &str) -> DbResult<Self::Statement<'c>>;

    fn set_transaction_isolation(&mut self, level: i32) -> DbResult<()>;

    fn transaction_isolation(&self) -> DbResult<i32>;

    fn set_auto_commit(&mut self, auto_commit: bool) -> DbResult<()>;

    fn auto_commit(&self) -> bool;

    /// Request read-only mode. Drivers may ignore the hint.
    fn set_read_only(&mut self, read_only: bool) -> DbResult<()>;

    fn is_read_only(&self) -> bool;

    fn commit(&mut self) -> DbResult<()>;

    fn rollback(&mut self) -> DbResult<()>;
}

/// Hands out connections and takes them back.
pub trait ConnectionProvider {
    type Connection: Connection;

    fn acquire(&self) -> DbResult<Self::Connection>;

    /// Return a connection, restoring whatever session state the provider
    /// promises to new borrowers.
    fn release(&self, connection: Self::Connection) -> DbResult<()>;
}

impl<P: ConnectionProvider + ?Sized> ConnectionProvider for &P {
    type Connection = P::Connection;

    fn acquire(&self) -> DbResult<Self::Connection> {
        (**self).acquire()
    }

    fn release(&self, connection: Self::Connection) -> DbResult<()> {
        (**self).release(connection)
    }
}

impl<P: ConnectionProvider + ?Sized> ConnectionProvider for std::sync::Arc<P> {
    type Connection = P::Connection;

    fn acquire(&self) -> DbResult<Self::Connection> {
        (**self).acquire()
    }

    fn release(&self, connection: Self::Connection) -> DbResult<()> {
        (**self).release(connection)
    }
}

/// Cursor type produced by the statements of connection `C`.
pub type CursorOf<C> = <C as Connection>::Cursor;

/// Statement type of connection `C`, borrowing it for `'s`.
pub type StatementOf<'s, C> = <C as Connection>::Statement<'s>;

/// Bind `values` to positions `1..=values.len()`.
pub fn bind_all<S: Statement>(statement: &mut S, values: &[SqlValue]) -> DbResult<()> {
    for (i, value) in values.iter().enumerate() {
        statement.bind_value(i + 1, value.clone())?;
    }
    Ok(())
}

/// A cursor over rows that are already in memory.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BufferedCursor {
    columns: Vec<String>,
    rows: VecDeque<Vec<SqlValue>>,
    current: Option<Vec<SqlValue>>,
}

impl BufferedCursor {
    pub fn new(columns: Vec<String>, rows: Vec<Vec<SqlValue>>) -> Self {
        Self {
            columns,
            rows: rows.into(),
            current: None,
        }
    }

    /// A cursor with no columns and no rows.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Rows not yet visited.
    pub fn remaining(&self) -> usize {
        self.rows.len()
    }
}

impl Cursor for BufferedCursor {
    fn column_names(&self) -> DbResult<Vec<String>> {
        Ok(self.columns.clone())
    }

    fn next(&mut self) -> DbResult<bool> {
        self.current = self.rows.pop_front();
        Ok(self.current.is_some())
    }

    fn value(&self, index: usize) -> DbResult<SqlValue> {
        let row = self
            .current
            .as_ref()
            .ok_or_else(|| DbError::extract("cursor is not positioned on a row"))?;
        row.get(index).cloned().ok_or_else(|| {
            DbError::extract(format!(
                "column index {index} out of bounds (len {})",
                row.len()
            ))
        })
    }

    fn close(self) -> DbResult<()> {
        Ok(())
    }
}
