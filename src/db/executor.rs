//! Statement execution primitives.
//!
//! Every operation exists once per dialect, generic over the sqlx executor so
//! the same code runs against a pool or against a transaction's connection.
//! Rows come back already decoded into [`JsonRow`]s.

use crate::db::pool::DbPool;
use crate::db::types::{JsonRow, RowToJson};
use crate::error::SqlResult;
use crate::models::{ExecResult, QueryParam};
use sqlx::{Either, Statement};

impl DbPool {
    /// Run a statement that returns no rows.
    pub async fn execute(&self, sql: &str, params: &[QueryParam]) -> SqlResult<ExecResult> {
        impl_db_dispatch!(self, DbPool, {
            MySql(pool) => mysql::execute(pool, sql, params).await,
            Postgres(pool) => postgres::execute(pool, sql, params).await,
            SQLite(pool) => sqlite::execute(pool, sql, params).await,
        })
    }

    /// Fetch at most one row.
    pub async fn fetch_optional(
        &self,
        sql: &str,
        params: &[QueryParam],
    ) -> SqlResult<Option<JsonRow>> {
        impl_db_dispatch!(self, DbPool, {
            MySql(pool) => mysql::fetch_optional(pool, sql, params).await,
            Postgres(pool) => postgres::fetch_optional(pool, sql, params).await,
            SQLite(pool) => sqlite::fetch_optional(pool, sql, params).await,
        })
    }

    /// Fetch every row.
    pub async fn fetch_all(&self, sql: &str, params: &[QueryParam]) -> SqlResult<Vec<JsonRow>> {
        impl_db_dispatch!(self, DbPool, {
            MySql(pool) => mysql::fetch_all(pool, sql, params).await,
            Postgres(pool) => postgres::fetch_all(pool, sql, params).await,
            SQLite(pool) => sqlite::fetch_all(pool, sql, params).await,
        })
    }

    /// Prepare `sql` on the server, surfacing syntax errors without running it.
    ///
    /// Returns the number of bind parameters when the driver reports it.
    pub async fn prepare(&self, sql: &str) -> SqlResult<Option<usize>> {
        impl_db_dispatch!(self, DbPool, {
            MySql(pool) => mysql::prepare(pool, sql).await,
            Postgres(pool) => postgres::prepare(pool, sql).await,
            SQLite(pool) => sqlite::prepare(pool, sql).await,
        })
    }
}

fn param_count<'q, S: Statement<'q>>(statement: &S) -> Option<usize> {
    statement.parameters().map(|params| match params {
        Either::Left(types) => types.len(),
        Either::Right(count) => count,
    })
}

fn decode_rows<R: RowToJson>(rows: &[R]) -> SqlResult<Vec<JsonRow>> {
    rows.iter().map(RowToJson::to_json_map).collect()
}

// =============================================================================
// Database-Specific Implementations
// =============================================================================
//
// Each module below provides the same interface adapted to its database type.
// The code structure is intentionally parallel to make differences obvious.

pub(crate) mod mysql {
    use super::*;
    use crate::db::params::mysql_query;
    use sqlx::{Executor, MySql};

    pub async fn execute<'c, E>(
        executor: E,
        sql: &str,
        params: &[QueryParam],
    ) -> SqlResult<ExecResult>
    where
        E: Executor<'c, Database = MySql>,
    {
        let result = mysql_query(sql, params).execute(executor).await?;
        Ok(ExecResult {
            rows_affected: result.rows_affected(),
            last_insert_id: i64::try_from(result.last_insert_id()).ok(),
        })
    }

    pub async fn fetch_optional<'c, E>(
        executor: E,
        sql: &str,
        params: &[QueryParam],
    ) -> SqlResult<Option<JsonRow>>
    where
        E: Executor<'c, Database = MySql>,
    {
        let row = mysql_query(sql, params).fetch_optional(executor).await?;
        row.as_ref().map(RowToJson::to_json_map).transpose()
    }

    pub async fn fetch_all<'c, E>(
        executor: E,
        sql: &str,
        params: &[QueryParam],
    ) -> SqlResult<Vec<JsonRow>>
    where
        E: Executor<'c, Database = MySql>,
    {
        let rows = mysql_query(sql, params).fetch_all(executor).await?;
        decode_rows(&rows)
    }

    pub async fn prepare<'c, E>(executor: E, sql: &str) -> SqlResult<Option<usize>>
    where
        E: Executor<'c, Database = MySql>,
    {
        let statement = executor.prepare(sql).await?;
        Ok(param_count(&statement))
    }
}

pub(crate) mod postgres {
    use super::*;
    use crate::db::params::postgres_query;
    use sqlx::{Executor, Postgres};

    pub async fn execute<'c, E>(
        executor: E,
        sql: &str,
        params: &[QueryParam],
    ) -> SqlResult<ExecResult>
    where
        E: Executor<'c, Database = Postgres>,
    {
        let result = postgres_query(sql, params).execute(executor).await?;
        // PostgreSQL reports generated keys through RETURNING, not the command tag
        Ok(ExecResult {
            rows_affected: result.rows_affected(),
            last_insert_id: None,
        })
    }

    pub async fn fetch_optional<'c, E>(
        executor: E,
        sql: &str,
        params: &[QueryParam],
    ) -> SqlResult<Option<JsonRow>>
    where
        E: Executor<'c, Database = Postgres>,
    {
        let row = postgres_query(sql, params).fetch_optional(executor).await?;
        row.as_ref().map(RowToJson::to_json_map).transpose()
    }

    pub async fn fetch_all<'c, E>(
        executor: E,
        sql: &str,
        params: &[QueryParam],
    ) -> SqlResult<Vec<JsonRow>>
    where
        E: Executor<'c, Database = Postgres>,
    {
        let rows = postgres_query(sql, params).fetch_all(executor).await?;
        decode_rows(&rows)
    }

    pub async fn prepare<'c, E>(executor: E, sql: &str) -> SqlResult<Option<usize>>
    where
        E: Executor<'c, Database = Postgres>,
    {
        let statement = executor.prepare(sql).await?;
        Ok(param_count(&statement))
    }
}

pub(crate) mod sqlite {
    use super::*;
    use crate::db::params::sqlite_query;
    use sqlx::{Executor, Sqlite};

    pub async fn execute<'c, E>(
        executor: E,
        sql: &str,
        params: &[QueryParam],
    ) -> SqlResult<ExecResult>
    where
        E: Executor<'c, Database = Sqlite>,
    {
        let result = sqlite_query(sql, params).execute(executor).await?;
        Ok(ExecResult {
            rows_affected: result.rows_affected(),
            last_insert_id: Some(result.last_insert_rowid()),
        })
    }

    pub async fn fetch_optional<'c, E>(
        executor: E,
        sql: &str,
        params: &[QueryParam],
    ) -> SqlResult<Option<JsonRow>>
    where
        E: Executor<'c, Database = Sqlite>,
    {
        let row = sqlite_query(sql, params).fetch_optional(executor).await?;
        row.as_ref().map(RowToJson::to_json_map).transpose()
    }

    pub async fn fetch_all<'c, E>(
        executor: E,
        sql: &str,
        params: &[QueryParam],
    ) -> SqlResult<Vec<JsonRow>>
    where
        E: Executor<'c, Database = Sqlite>,
    {
        let rows = sqlite_query(sql, params).fetch_all(executor).await?;
        decode_rows(&rows)
    }

    pub async fn prepare<'c, E>(executor: E, sql: &str) -> SqlResult<Option<usize>>
    where
        E: Executor<'c, Database = Sqlite>,
    {
        let statement = executor.prepare(sql).await?;
        Ok(param_count(&statement))
    }
}
