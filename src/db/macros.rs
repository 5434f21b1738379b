//! Database dispatch macros for reducing code duplication.
//!
//! The driver layer keeps one concrete sqlx type per dialect. These macros
//! generate the per-dialect match arms so each operation reads as one block.

/// Macro for generating database dispatch match arms.
///
/// Works on any enum in `crate::db` whose variants are `MySql`, `Postgres`
/// and `SQLite`, such as `DbPool` and `DbTransaction`.
///
/// # Example
///
/// ```ignore
/// impl_db_dispatch!(pool, DbPool, {
///     MySql(p) => do_mysql(p),
///     Postgres(p) => do_postgres(p),
///     SQLite(p) => do_sqlite(p),
/// });
/// ```
#[macro_export]
macro_rules! impl_db_dispatch {
    ($value:expr, $enum:ident, { $($variant:ident($p:ident) => $body:expr),+ $(,)? }) => {
        match $value {
            $(
                $crate::db::$enum::$variant($p) => $body,
            )+
        }
    };
}

pub use impl_db_dispatch;
