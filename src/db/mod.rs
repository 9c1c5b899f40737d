//! Database abstraction layer.
//!
//! This module provides database access functionality:
//! - Driver traits for connections, statements and cursors
//! - Statement execution with guaranteed resource release
//! - Transaction demarcation
//! - sqlx connection pools and type mappings
//! - Database dispatch macros for reducing code duplication

pub mod driver;
pub mod executor;
#[macro_use]
pub mod macros;
pub mod params;
pub mod pool;
pub mod pooled;
pub mod row;
pub mod transaction;
pub mod types;

pub use driver::{
    BufferedCursor, Connection, ConnectionProvider, Cursor, CursorOf, Statement, StatementOf,
    bind_all,
};
pub use executor::ConnectionOperations;
pub use pool::{DbPool, SqlxConnection, SqlxDataSource, SqlxStatement};
pub use pooled::PooledOperations;
pub use row::{GeneratedKeyRow, Row, collect_generated_keys, collect_rows};
pub use transaction::{IsolationLevel, TransactionConfig, run_in_transaction, transactional};
