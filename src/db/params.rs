//! Parameter binding for the sqlx backends.
//!
//! Each backend gets a builder that turns SQL text and the values bound to a
//! statement into a sqlx query, binding in position order.

use crate::models::SqlValue;
use sqlx::mysql::MySqlArguments;
use sqlx::postgres::PgArguments;
use sqlx::sqlite::SqliteArguments;
use sqlx::types::Json;
use sqlx::{MySql, Postgres, Sqlite};

pub(crate) fn mysql_query<'q>(
    sql: &'q str,
    params: &[&'q SqlValue],
) -> sqlx::query::Query<'q, MySql, MySqlArguments> {
    params
        .iter()
        .copied()
        .fold(sqlx::query(sql), |query, param| bind_mysql_param(query, param))
}

pub(crate) fn postgres_query<'q>(
    sql: &'q str,
    params: &[&'q SqlValue],
) -> sqlx::query::Query<'q, Postgres, PgArguments> {
    params
        .iter()
        .copied()
        .fold(sqlx::query(sql), |query, param| bind_postgres_param(query, param))
}

pub(crate) fn sqlite_query<'q>(
    sql: &'q str,
    params: &[&'q SqlValue],
) -> sqlx::query::Query<'q, Sqlite, SqliteArguments<'q>> {
    params
        .iter()
        .copied()
        .fold(sqlx::query(sql), |query, param| bind_sqlite_param(query, param))
}

/// Bind a parameter to a MySQL query.
fn bind_mysql_param<'q>(
    query: sqlx::query::Query<'q, MySql, MySqlArguments>,
    param: &'q SqlValue,
) -> sqlx::query::Query<'q, MySql, MySqlArguments> {
    match param {
        SqlValue::Null => query.bind(None::<String>),
        SqlValue::Bool(v) => query.bind(*v),
        SqlValue::Int(v) => query.bind(*v),
        SqlValue::Float(v) => query.bind(*v),
        SqlValue::String(v) => query.bind(v.as_str()),
        SqlValue::Bytes(v) => query.bind(v.as_slice()),
        SqlValue::Json(v) => query.bind(Json(v)),
    }
}

/// Bind a parameter to a PostgreSQL query.
fn bind_postgres_param<'q>(
    query: sqlx::query::Query<'q, Postgres, PgArguments>,
    param: &'q SqlValue,
) -> sqlx::query::Query<'q, Postgres, PgArguments> {
    match param {
        SqlValue::Null => query.bind(None::<String>),
        SqlValue::Bool(v) => query.bind(*v),
        SqlValue::Int(v) => query.bind(*v),
        SqlValue::Float(v) => query.bind(*v),
        SqlValue::String(v) => query.bind(v.as_str()),
        SqlValue::Bytes(v) => query.bind(v.as_slice()),
        SqlValue::Json(v) => query.bind(Json(v)),
    }
}

/// Bind a parameter to a SQLite query.
fn bind_sqlite_param<'q>(
    query: sqlx::query::Query<'q, Sqlite, SqliteArguments<'q>>,
    param: &'q SqlValue,
) -> sqlx::query::Query<'q, Sqlite, SqliteArguments<'q>> {
    match param {
        SqlValue::Null => query.bind(None::<String>),
        SqlValue::Bool(v) => query.bind(*v),
        SqlValue::Int(v) => query.bind(*v),
        SqlValue::Float(v) => query.bind(*v),
        SqlValue::String(v) => query.bind(v.as_str()),
        SqlValue::Bytes(v) => query.bind(v.as_slice()),
        // SQLite doesn't have native JSON type, store as string
        SqlValue::Json(v) => query.bind(v.to_string()),
    }
}
