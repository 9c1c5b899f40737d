//! Data models shared by the executors and the sqlx backend.

pub mod connection;
pub mod value;

pub use connection::DatabaseType;
pub use value::{FromSqlValue, SqlValue};
