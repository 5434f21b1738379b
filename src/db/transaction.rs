//! Database-specific transaction wrapper.
//!
//! A [`DbTransaction`] owns one pooled connection from `begin` until `commit`
//! or `rollback` consumes it. Dropping it unfinished (for example while
//! unwinding from a panic) rolls back through sqlx's own drop handling.

use crate::db::executor::{mysql, postgres, sqlite};
use crate::db::pool::DbPool;
use crate::db::types::JsonRow;
use crate::error::SqlResult;
use crate::models::{DatabaseType, ExecResult, QueryParam};
use sqlx::{MySql, Postgres, Sqlite, Transaction};
use tracing::debug;

/// Database-specific transaction wrapper.
pub enum DbTransaction {
    MySql(Transaction<'static, MySql>),
    Postgres(Transaction<'static, Postgres>),
    SQLite(Transaction<'static, Sqlite>),
}

impl std::fmt::Debug for DbTransaction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("DbTransaction").field(&self.db_type()).finish()
    }
}

impl DbTransaction {
    /// Begin a transaction on a connection taken from `pool`.
    pub async fn begin(pool: &DbPool) -> SqlResult<Self> {
        let tx = match pool {
            DbPool::MySql(pool) => DbTransaction::MySql(pool.begin().await?),
            DbPool::Postgres(pool) => DbTransaction::Postgres(pool.begin().await?),
            DbPool::SQLite(pool) => DbTransaction::SQLite(pool.begin().await?),
        };
        debug!(db_type = %tx.db_type(), "Transaction started");
        Ok(tx)
    }

    /// Get the database type for this transaction.
    pub fn db_type(&self) -> DatabaseType {
        match self {
            DbTransaction::MySql(_) => DatabaseType::MySQL,
            DbTransaction::Postgres(_) => DatabaseType::PostgreSQL,
            DbTransaction::SQLite(_) => DatabaseType::SQLite,
        }
    }

    /// Commit the transaction.
    pub async fn commit(self) -> SqlResult<()> {
        let db_type = self.db_type();
        impl_db_dispatch!(self, DbTransaction, {
            MySql(tx) => tx.commit().await?,
            Postgres(tx) => tx.commit().await?,
            SQLite(tx) => tx.commit().await?,
        });
        debug!(db_type = %db_type, "Transaction committed");
        Ok(())
    }

    /// Rollback the transaction.
    pub async fn rollback(self) -> SqlResult<()> {
        let db_type = self.db_type();
        impl_db_dispatch!(self, DbTransaction, {
            MySql(tx) => tx.rollback().await?,
            Postgres(tx) => tx.rollback().await?,
            SQLite(tx) => tx.rollback().await?,
        });
        debug!(db_type = %db_type, "Transaction rolled back");
        Ok(())
    }

    /// Run a statement that returns no rows inside the transaction.
    pub async fn execute(&mut self, sql: &str, params: &[QueryParam]) -> SqlResult<ExecResult> {
        impl_db_dispatch!(self, DbTransaction, {
            MySql(tx) => mysql::execute(&mut **tx, sql, params).await,
            Postgres(tx) => postgres::execute(&mut **tx, sql, params).await,
            SQLite(tx) => sqlite::execute(&mut **tx, sql, params).await,
        })
    }

    /// Fetch at most one row inside the transaction.
    pub async fn fetch_optional(
        &mut self,
        sql: &str,
        params: &[QueryParam],
    ) -> SqlResult<Option<JsonRow>> {
        impl_db_dispatch!(self, DbTransaction, {
            MySql(tx) => mysql::fetch_optional(&mut **tx, sql, params).await,
            Postgres(tx) => postgres::fetch_optional(&mut **tx, sql, params).await,
            SQLite(tx) => sqlite::fetch_optional(&mut **tx, sql, params).await,
        })
    }

    /// Fetch every row inside the transaction.
    pub async fn fetch_all(&mut self, sql: &str, params: &[QueryParam]) -> SqlResult<Vec<JsonRow>> {
        impl_db_dispatch!(self, DbTransaction, {
            MySql(tx) => mysql::fetch_all(&mut **tx, sql, params).await,
            Postgres(tx) => postgres::fetch_all(&mut **tx, sql, params).await,
            SQLite(tx) => sqlite::fetch_all(&mut **tx, sql, params).await,
        })
    }

    /// Prepare `sql` on the transaction's connection.
    pub async fn prepare(&mut self, sql: &str) -> SqlResult<Option<usize>> {
        impl_db_dispatch!(self, DbTransaction, {
            MySql(tx) => mysql::prepare(&mut **tx, sql).await,
            Postgres(tx) => postgres::prepare(&mut **tx, sql).await,
            SQLite(tx) => sqlite::prepare(&mut **tx, sql).await,
        })
    }
}
