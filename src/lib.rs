//! SQL Template Library
//!
//! Blocking, resource-safe statement execution and transaction demarcation
//! over SQL connection pools (SQLite, PostgreSQL, MySQL).

pub mod config;
pub mod db;
pub mod error;
pub mod models;

pub use config::Config;
pub use error::{DbError, DbResult, ErrorKind};
