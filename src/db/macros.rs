//! Database dispatch macros for reducing code duplication.
//!
//! Pools and pooled connections are held in one enum variant per backend.
//! The macro below expands the match over those variants at compile time.

/// Macro for generating database dispatch match arms.
///
/// The first argument names the enum in [`crate::db::pool`] being matched,
/// the second is the value to match on.
///
/// # Example
///
/// ```ignore
/// impl_db_dispatch!(DbPool, pool, {
///     MySql(p) => do_mysql(p),
///     Postgres(p) => do_postgres(p),
///     SQLite(p) => do_sqlite(p),
/// });
/// ```
#[macro_export]
macro_rules! impl_db_dispatch {
    ($enum:ident, $target:expr, { $($variant:ident($p:ident) => $body:expr),+ $(,)? }) => {
        match $target {
            $(
                $crate::db::pool::$enum::$variant($p) => $body,
            )+
        }
    };
}

pub use impl_db_dispatch;
