//! Prepared statement sessions.

use crate::conn::marshal::{
    unmarshal_row, unmarshal_row_partial, unmarshal_rows, unmarshal_rows_partial,
};
use crate::conn::session::TxSession;
use crate::conn::slow::SlowLog;
use crate::db::{DbPool, JsonRow};
use crate::error::{SqlError, SqlResult};
use crate::models::{ExecResult, QueryParam};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::time::Instant;
use tracing::{debug, warn};

#[derive(Debug)]
enum Target<'a> {
    /// Datasource the facade resolved when the statement was prepared.
    Pool { pool: DbPool, slow: SlowLog },
    Transaction(&'a TxSession),
}

/// A statement prepared by [`SqlConn::prepare`](crate::SqlConn::prepare) or
/// [`TxSession::prepare`], reusable until closed.
///
/// The statement stays bound to the datasource or transaction it was
/// prepared on; it is never re-routed and never passes through the breaker.
/// Call [`StmtSession::close`] when done. Dropping an unclosed statement logs
/// a warning.
///
/// Each call checks its argument count against the prepared statement. The
/// server-side handle itself lives in sqlx's per-connection statement cache,
/// which re-prepares on whichever pooled connection runs the call.
#[derive(Debug)]
pub struct StmtSession<'a> {
    target: Target<'a>,
    query: String,
    params: Option<usize>,
    closed: bool,
}

impl<'a> StmtSession<'a> {
    pub(crate) fn on_pool(
        pool: DbPool,
        query: &str,
        params: Option<usize>,
        slow: SlowLog,
    ) -> Self {
        Self {
            target: Target::Pool { pool, slow },
            query: query.to_string(),
            params,
            closed: false,
        }
    }

    pub(crate) fn in_transaction(tx: &'a TxSession, query: &str, params: Option<usize>) -> Self {
        Self {
            target: Target::Transaction(tx),
            query: query.to_string(),
            params,
            closed: false,
        }
    }

    /// The SQL text this statement runs.
    pub fn query(&self) -> &str {
        &self.query
    }

    /// Bind parameters the statement expects, if the driver reported it.
    pub fn param_count(&self) -> Option<usize> {
        self.params
    }

    pub fn is_transactional(&self) -> bool {
        matches!(self.target, Target::Transaction(_))
    }

    pub async fn exec(&self, params: &[QueryParam]) -> SqlResult<ExecResult> {
        self.check_params(params)?;
        match &self.target {
            Target::Pool { pool, slow } => {
                let started = Instant::now();
                let result = pool.execute(&self.query, params).await;
                slow.observe(&self.query, started);
                result
            }
            Target::Transaction(tx) => tx.exec(&self.query, params).await,
        }
    }

    pub async fn query_row<T: DeserializeOwned>(&self, params: &[QueryParam]) -> SqlResult<T> {
        unmarshal_row(self.fetch_optional(params).await?)
    }

    pub async fn query_row_partial<T>(&self, params: &[QueryParam]) -> SqlResult<T>
    where
        T: DeserializeOwned + Default + Serialize,
    {
        unmarshal_row_partial(self.fetch_optional(params).await?)
    }

    pub async fn query_rows<T: DeserializeOwned>(&self, params: &[QueryParam]) -> SqlResult<Vec<T>> {
        unmarshal_rows(self.fetch_all(params).await?)
    }

    pub async fn query_rows_partial<T>(&self, params: &[QueryParam]) -> SqlResult<Vec<T>>
    where
        T: DeserializeOwned + Default + Serialize,
    {
        unmarshal_rows_partial(self.fetch_all(params).await?)
    }

    /// Release the statement.
    ///
    /// Only the session is released; cached server-side handles are evicted
    /// by sqlx when its statement cache fills or the connection closes.
    pub fn close(mut self) {
        self.closed = true;
        debug!(sql = %self.query, "Statement closed");
    }

    fn check_params(&self, params: &[QueryParam]) -> SqlResult<()> {
        match self.params {
            Some(expected) if expected != params.len() => Err(SqlError::ParamCount {
                expected,
                actual: params.len(),
            }),
            _ => Ok(()),
        }
    }

    async fn fetch_optional(&self, params: &[QueryParam]) -> SqlResult<Option<JsonRow>> {
        self.check_params(params)?;
        match &self.target {
            Target::Pool { pool, slow } => {
                let started = Instant::now();
                let result = pool.fetch_optional(&self.query, params).await;
                slow.observe(&self.query, started);
                result
            }
            Target::Transaction(tx) => tx.fetch_optional(&self.query, params).await,
        }
    }

    async fn fetch_all(&self, params: &[QueryParam]) -> SqlResult<Vec<JsonRow>> {
        self.check_params(params)?;
        match &self.target {
            Target::Pool { pool, slow } => {
                let started = Instant::now();
                let result = pool.fetch_all(&self.query, params).await;
                slow.observe(&self.query, started);
                result
            }
            Target::Transaction(tx) => tx.fetch_all(&self.query, params).await,
        }
    }
}

impl Drop for StmtSession<'_> {
    fn drop(&mut self) {
        if !self.closed {
            warn!(sql = %self.query, "Statement dropped without close");
        }
    }
}
