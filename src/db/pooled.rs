//! Pool-scoped execution: one connection per call.

use crate::db::driver::{ConnectionProvider, CursorOf, StatementOf};
use crate::db::executor::{ConnectionOperations, finish};
use crate::db::row::GeneratedKeyRow;
use crate::db::transaction::{TransactionConfig, transactional};
use crate::error::DbResult;

/// Runs connection-consuming actions on connections borrowed from a provider.
///
/// The connection is acquired before the action runs and released on every
/// exit path before the call returns. A failed release turns a successful call
/// into a failure.
#[derive(Debug, Clone)]
pub struct PooledOperations<P> {
    provider: P,
}

impl<P: ConnectionProvider> PooledOperations<P> {
    pub fn new(provider: P) -> Self {
        Self { provider }
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    pub fn into_inner(self) -> P {
        self.provider
    }

    /// Acquire a connection, run `action` on it, release it.
    pub fn execute<R>(
        &self,
        action: impl FnOnce(&mut P::Connection) -> DbResult<R>,
    ) -> DbResult<R> {
        let mut connection = self.provider.acquire()?;
        let result = action(&mut connection);
        finish(result, self.provider.release(connection))
    }

    /// Like [`execute`](Self::execute), with `decorate` applied to `action`
    /// first.
    pub fn execute_decorated<R, A, D, W>(&self, decorate: D, action: A) -> DbResult<R>
    where
        A: FnOnce(&mut P::Connection) -> DbResult<R>,
        D: FnOnce(A) -> W,
        W: FnOnce(&mut P::Connection) -> DbResult<R>,
    {
        self.execute(decorate(action))
    }

    /// Run `action` inside a transaction configured by `config`.
    pub fn execute_in_transaction<R, A>(
        &self,
        config: TransactionConfig,
        action: A,
    ) -> DbResult<R>
    where
        A: FnOnce(&mut P::Connection) -> DbResult<R>,
    {
        self.execute_decorated(
            |action| transactional::<P::Connection, R, A>(config, action),
            action,
        )
    }

    /// Prepare a statement on a borrowed connection, hand it to `run`, then
    /// close the statement and release the connection.
    pub fn execute_statement<R>(
        &self,
        prepare: impl for<'s> FnOnce(
            &'s mut P::Connection,
        ) -> DbResult<StatementOf<'s, P::Connection>>,
        run: impl for<'s> FnOnce(&mut StatementOf<'s, P::Connection>) -> DbResult<R>,
    ) -> DbResult<R>
    where
        P::Connection: 'static,
    {
        self.execute(|connection| ConnectionOperations::new(connection).execute(prepare, run))
    }

    /// Run a query on a borrowed connection and hand its cursor to `extract`.
    pub fn query<R>(
        &self,
        sql: &str,
        bind: impl for<'s> FnOnce(&mut StatementOf<'s, P::Connection>) -> DbResult<()>,
        extract: impl FnOnce(&mut CursorOf<P::Connection>) -> DbResult<R>,
    ) -> DbResult<R>
    where
        P::Connection: 'static,
    {
        self.execute(|connection| ConnectionOperations::new(connection).query(sql, bind, extract))
    }

    /// Execute a data-modifying statement on a borrowed connection.
    pub fn update(
        &self,
        sql: &str,
        bind: impl for<'s> FnOnce(&mut StatementOf<'s, P::Connection>) -> DbResult<()>,
    ) -> DbResult<u64>
    where
        P::Connection: 'static,
    {
        self.execute(|connection| ConnectionOperations::new(connection).update(sql, bind))
    }

    /// Execute an insert on a borrowed connection and return its generated
    /// keys.
    pub fn update_returning_keys(
        &self,
        sql: &str,
        bind: impl for<'s> FnOnce(&mut StatementOf<'s, P::Connection>) -> DbResult<()>,
    ) -> DbResult<Vec<GeneratedKeyRow>>
    where
        P::Connection: 'static,
    {
        self.execute(|connection| {
            ConnectionOperations::new(connection).update_returning_keys(sql, bind)
        })
    }
}
