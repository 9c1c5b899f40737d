//! Recording mock driver shared by the integration tests.
//!
//! Every driver call is appended to an event log so tests can assert how many
//! times a statement was closed or a transaction committed. Failures can be
//! injected per operation.

#![allow(dead_code)]

use sql_template::db::{Connection, ConnectionProvider, Cursor, Statement};
use sql_template::error::{DbError, DbResult};
use sql_template::models::SqlValue;
use std::cell::RefCell;
use std::rc::Rc;

#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    Acquire,
    Release,
    Prepare(String),
    PrepareReturningKeys(String),
    Bind(usize, SqlValue),
    ExecuteUpdate,
    ExecuteQuery,
    GeneratedKeys,
    CursorClosed,
    StatementClosed,
    SetIsolation(i32),
    SetReadOnly(bool),
    SetAutoCommit(bool),
    Commit,
    Rollback,
}

/// Operations that fail when their flag is set.
#[derive(Debug, Clone, Default)]
pub struct Failures {
    pub acquire: bool,
    pub release: bool,
    pub prepare: bool,
    pub bind: bool,
    pub execute: bool,
    pub cursor_close: bool,
    pub statement_close: bool,
    pub set_isolation: bool,
    pub set_read_only: bool,
    /// Fails turning auto-commit back on.
    pub enable_auto_commit: bool,
    pub commit: bool,
    pub rollback: bool,
}

/// What the driver returns.
#[derive(Debug, Clone, Default)]
pub struct Script {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<SqlValue>>,
    pub update_count: u64,
    pub key_columns: Vec<String>,
    pub key_rows: Vec<Vec<SqlValue>>,
    /// Overrides the isolation constant connections report.
    pub reported_isolation: Option<i32>,
    pub failures: Failures,
}

#[derive(Debug, Default)]
struct Shared {
    events: Vec<Event>,
    script: Script,
}

/// Handle to the mock driver; clones share the same log and script.
#[derive(Debug, Clone, Default)]
pub struct MockDriver {
    shared: Rc<RefCell<Shared>>,
}

impl MockDriver {
    pub fn new() -> Self {
        Self::default()
    }

    /// A driver whose queries return the given rows.
    pub fn with_rows(columns: &[&str], rows: Vec<Vec<SqlValue>>) -> Self {
        let driver = Self::new();
        driver.script(|s| {
            s.columns = columns.iter().map(|c| c.to_string()).collect();
            s.rows = rows;
        });
        driver
    }

    pub fn script(&self, f: impl FnOnce(&mut Script)) {
        f(&mut self.shared.borrow_mut().script);
    }

    pub fn fail(&self, f: impl FnOnce(&mut Failures)) {
        f(&mut self.shared.borrow_mut().script.failures);
    }

    pub fn events(&self) -> Vec<Event> {
        self.shared.borrow().events.clone()
    }

    pub fn count(&self, event: &Event) -> usize {
        self.shared
            .borrow()
            .events
            .iter()
            .filter(|e| *e == event)
            .count()
    }

    pub fn clear_events(&self) {
        self.shared.borrow_mut().events.clear();
    }

    /// A fresh connection that is not tracked by the provider log.
    pub fn connection(&self) -> MockConnection {
        MockConnection {
            driver: self.clone(),
            auto_commit: true,
            isolation: 2,
            read_only: false,
        }
    }

    fn record(&self, event: Event) {
        self.shared.borrow_mut().events.push(event);
    }

    fn failures(&self) -> Failures {
        self.shared.borrow().script.failures.clone()
    }

    fn snapshot(&self) -> Script {
        self.shared.borrow().script.clone()
    }
}

impl ConnectionProvider for MockDriver {
    type Connection = MockConnection;

    fn acquire(&self) -> DbResult<MockConnection> {
        self.record(Event::Acquire);
        if self.failures().acquire {
            return Err(DbError::acquire("injected acquire failure"));
        }
        Ok(self.connection())
    }

    fn release(&self, _connection: MockConnection) -> DbResult<()> {
        self.record(Event::Release);
        if self.failures().release {
            return Err(DbError::release("injected release failure"));
        }
        Ok(())
    }
}

#[derive(Debug)]
pub struct MockConnection {
    driver: MockDriver,
    auto_commit: bool,
    isolation: i32,
    read_only: bool,
}

impl MockConnection {
    fn prepare_statement(&mut self, sql: &str, return_keys: bool) -> DbResult<MockStatement<'_>> {
        self.driver.record(if return_keys {
            Event::PrepareReturningKeys(sql.to_string())
        } else {
            Event::Prepare(sql.to_string())
        });
        if self.driver.failures().prepare {
            return Err(DbError::prepare("injected prepare failure"));
        }
        Ok(MockStatement {
            connection: self,
            return_keys,
            executed: false,
        })
    }
}

impl Connection for MockConnection {
    type Cursor = MockCursor;
    type Statement<'c> = MockStatement<'c>;

    fn prepare<'c>(&'c mut self, sql: &str) -> DbResult<MockStatement<'c>> {
        self.prepare_statement(sql, false)
    }

    fn prepare_returning_keys<'c>(&'c mut self, sql: &str) -> DbResult<MockStatement<'c>> {
        self.prepare_statement(sql, true)
    }

    fn set_transaction_isolation(&mut self, level: i32) -> DbResult<()> {
        self.driver.record(Event::SetIsolation(level));
        if self.driver.failures().set_isolation {
            return Err(DbError::transaction("injected isolation failure"));
        }
        self.isolation = level;
        Ok(())
    }

    fn transaction_isolation(&self) -> DbResult<i32> {
        Ok(self
            .driver
            .snapshot()
            .reported_isolation
            .unwrap_or(self.isolation))
    }

    fn set_auto_commit(&mut self, auto_commit: bool) -> DbResult<()> {
        self.driver.record(Event::SetAutoCommit(auto_commit));
        if auto_commit && self.driver.failures().enable_auto_commit {
            return Err(DbError::transaction("injected auto-commit failure"));
        }
        self.auto_commit = auto_commit;
        Ok(())
    }

    fn auto_commit(&self) -> bool {
        self.auto_commit
    }

    fn set_read_only(&mut self, read_only: bool) -> DbResult<()> {
        self.driver.record(Event::SetReadOnly(read_only));
        if self.driver.failures().set_read_only {
            return Err(DbError::transaction("injected read-only failure"));
        }
        self.read_only = read_only;
        Ok(())
    }

    fn is_read_only(&self) -> bool {
        self.read_only
    }

    fn commit(&mut self) -> DbResult<()> {
        self.driver.record(Event::Commit);
        if self.driver.failures().commit {
            return Err(DbError::transaction("injected commit failure"));
        }
        Ok(())
    }

    fn rollback(&mut self) -> DbResult<()> {
        self.driver.record(Event::Rollback);
        if self.driver.failures().rollback {
            return Err(DbError::transaction("injected rollback failure"));
        }
        Ok(())
    }
}

#[derive(Debug)]
pub struct MockStatement<'c> {
    connection: &'c mut MockConnection,
    return_keys: bool,
    executed: bool,
}

impl MockStatement<'_> {
    fn driver(&self) -> &MockDriver {
        &self.connection.driver
    }
}

impl Statement for MockStatement<'_> {
    type Cursor = MockCursor;

    fn bind_value(&mut self, index: usize, value: SqlValue) -> DbResult<()> {
        self.driver().record(Event::Bind(index, value));
        if self.driver().failures().bind || index == 0 {
            return Err(DbError::bind(format!("cannot bind parameter {index}")));
        }
        Ok(())
    }

    fn execute_update(&mut self) -> DbResult<u64> {
        self.driver().record(Event::ExecuteUpdate);
        if self.driver().failures().execute {
            return Err(DbError::execute("injected execute failure"));
        }
        self.executed = true;
        Ok(self.driver().snapshot().update_count)
    }

    fn execute_query(&mut self) -> DbResult<MockCursor> {
        self.driver().record(Event::ExecuteQuery);
        if self.driver().failures().execute {
            return Err(DbError::execute("injected execute failure"));
        }
        let script = self.driver().snapshot();
        Ok(MockCursor::new(self.driver().clone(), script.columns, script.rows))
    }

    fn generated_keys(&mut self) -> DbResult<MockCursor> {
        self.driver().record(Event::GeneratedKeys);
        if !self.return_keys || !self.executed {
            return Err(DbError::extract("no generated keys available"));
        }
        let script = self.driver().snapshot();
        Ok(MockCursor::new(
            self.driver().clone(),
            script.key_columns,
            script.key_rows,
        ))
    }

    fn close(self) -> DbResult<()> {
        self.driver().record(Event::StatementClosed);
        if self.driver().failures().statement_close {
            return Err(DbError::release("injected statement close failure"));
        }
        Ok(())
    }
}

#[derive(Debug)]
pub struct MockCursor {
    driver: MockDriver,
    columns: Vec<String>,
    rows: Vec<Vec<SqlValue>>,
    position: Option<usize>,
}

impl MockCursor {
    fn new(driver: MockDriver, columns: Vec<String>, rows: Vec<Vec<SqlValue>>) -> Self {
        Self {
            driver,
            columns,
            rows,
            position: None,
        }
    }
}

impl Cursor for MockCursor {
    fn column_names(&self) -> DbResult<Vec<String>> {
        Ok(self.columns.clone())
    }

    fn next(&mut self) -> DbResult<bool> {
        let next = self.position.map_or(0, |p| p + 1);
        self.position = Some(next);
        Ok(next < self.rows.len())
    }

    fn value(&self, index: usize) -> DbResult<SqlValue> {
        self.position
            .and_then(|p| self.rows.get(p))
            .and_then(|row| row.get(index))
            .cloned()
            .ok_or_else(|| DbError::extract(format!("no value at column {index}")))
    }

    fn close(self) -> DbResult<()> {
        self.driver.record(Event::CursorClosed);
        if self.driver.failures().cursor_close {
            return Err(DbError::release("injected cursor close failure"));
        }
        Ok(())
    }
}
