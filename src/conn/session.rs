//! The session contract and the transaction-bound session.

use crate::conn::marshal::{
    unmarshal_row, unmarshal_row_partial, unmarshal_rows, unmarshal_rows_partial,
};
use crate::conn::slow::SlowLog;
use crate::conn::statement::StmtSession;
use crate::db::{DbTransaction, JsonRow};
use crate::error::{SqlError, SqlResult};
use crate::models::{ExecResult, QueryParam};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::future::Future;
use std::time::Instant;
use tokio::sync::Mutex;

/// Operations shared by the facade and the transaction session, so callers
/// can write code that runs either inside or outside a transaction.
pub trait Session: Send + Sync {
    fn exec(
        &self,
        query: &str,
        params: &[QueryParam],
    ) -> impl Future<Output = SqlResult<ExecResult>> + Send;

    fn prepare(&self, query: &str) -> impl Future<Output = SqlResult<StmtSession<'_>>> + Send;

    fn query_row<T>(
        &self,
        query: &str,
        params: &[QueryParam],
    ) -> impl Future<Output = SqlResult<T>> + Send
    where
        T: DeserializeOwned + Send;

    fn query_row_partial<T>(
        &self,
        query: &str,
        params: &[QueryParam],
    ) -> impl Future<Output = SqlResult<T>> + Send
    where
        T: DeserializeOwned + Default + Serialize + Send;

    fn query_rows<T>(
        &self,
        query: &str,
        params: &[QueryParam],
    ) -> impl Future<Output = SqlResult<Vec<T>>> + Send
    where
        T: DeserializeOwned + Send;

    fn query_rows_partial<T>(
        &self,
        query: &str,
        params: &[QueryParam],
    ) -> impl Future<Output = SqlResult<Vec<T>>> + Send
    where
        T: DeserializeOwned + Default + Serialize + Send;
}

/// Session bound to one open transaction.
///
/// Statements run on the transaction's connection as issued. There is no
/// routing and no breaker here; the facade guarded the `transact` call that
/// created the session. Using a session after its transaction finished
/// returns [`SqlError::TxDone`].
#[derive(Debug)]
pub struct TxSession {
    tx: Mutex<Option<DbTransaction>>,
    slow: SlowLog,
}

impl TxSession {
    pub(crate) fn new(tx: DbTransaction, slow: SlowLog) -> Self {
        Self {
            tx: Mutex::new(Some(tx)),
            slow,
        }
    }

    pub async fn exec(&self, query: &str, params: &[QueryParam]) -> SqlResult<ExecResult> {
        let started = Instant::now();
        let mut guard = self.tx.lock().await;
        let tx = guard.as_mut().ok_or(SqlError::TxDone)?;
        let result = tx.execute(query, params).await;
        self.slow.observe(query, started);
        result
    }

    /// Prepare `query` on the transaction's connection.
    pub async fn prepare(&self, query: &str) -> SqlResult<StmtSession<'_>> {
        let params = {
            let mut guard = self.tx.lock().await;
            let tx = guard.as_mut().ok_or(SqlError::TxDone)?;
            tx.prepare(query).await?
        };
        Ok(StmtSession::in_transaction(self, query, params))
    }

    pub async fn query_row<T: DeserializeOwned>(
        &self,
        query: &str,
        params: &[QueryParam],
    ) -> SqlResult<T> {
        unmarshal_row(self.fetch_optional(query, params).await?)
    }

    pub async fn query_row_partial<T>(&self, query: &str, params: &[QueryParam]) -> SqlResult<T>
    where
        T: DeserializeOwned + Default + Serialize,
    {
        unmarshal_row_partial(self.fetch_optional(query, params).await?)
    }

    pub async fn query_rows<T: DeserializeOwned>(
        &self,
        query: &str,
        params: &[QueryParam],
    ) -> SqlResult<Vec<T>> {
        unmarshal_rows(self.fetch_all(query, params).await?)
    }

    pub async fn query_rows_partial<T>(
        &self,
        query: &str,
        params: &[QueryParam],
    ) -> SqlResult<Vec<T>>
    where
        T: DeserializeOwned + Default + Serialize,
    {
        unmarshal_rows_partial(self.fetch_all(query, params).await?)
    }

    /// True once the transaction was committed or rolled back.
    pub async fn is_finished(&self) -> bool {
        self.tx.lock().await.is_none()
    }

    pub(crate) async fn fetch_optional(
        &self,
        query: &str,
        params: &[QueryParam],
    ) -> SqlResult<Option<JsonRow>> {
        let started = Instant::now();
        let mut guard = self.tx.lock().await;
        let tx = guard.as_mut().ok_or(SqlError::TxDone)?;
        let result = tx.fetch_optional(query, params).await;
        self.slow.observe(query, started);
        result
    }

    pub(crate) async fn fetch_all(
        &self,
        query: &str,
        params: &[QueryParam],
    ) -> SqlResult<Vec<JsonRow>> {
        let started = Instant::now();
        let mut guard = self.tx.lock().await;
        let tx = guard.as_mut().ok_or(SqlError::TxDone)?;
        let result = tx.fetch_all(query, params).await;
        self.slow.observe(query, started);
        result
    }

    pub(crate) async fn commit(&self) -> SqlResult<()> {
        let tx = self.tx.lock().await.take().ok_or(SqlError::TxDone)?;
        tx.commit().await
    }

    pub(crate) async fn rollback(&self) -> SqlResult<()> {
        let tx = self.tx.lock().await.take().ok_or(SqlError::TxDone)?;
        tx.rollback().await
    }
}

impl Session for TxSession {
    fn exec(
        &self,
        query: &str,
        params: &[QueryParam],
    ) -> impl Future<Output = SqlResult<ExecResult>> + Send {
        TxSession::exec(self, query, params)
    }

    fn prepare(&self, query: &str) -> impl Future<Output = SqlResult<StmtSession<'_>>> + Send {
        TxSession::prepare(self, query)
    }

    fn query_row<T>(
        &self,
        query: &str,
        params: &[QueryParam],
    ) -> impl Future<Output = SqlResult<T>> + Send
    where
        T: DeserializeOwned + Send,
    {
        TxSession::query_row(self, query, params)
    }

    fn query_row_partial<T>(
        &self,
        query: &str,
        params: &[QueryParam],
    ) -> impl Future<Output = SqlResult<T>> + Send
    where
        T: DeserializeOwned + Default + Serialize + Send,
    {
        TxSession::query_row_partial(self, query, params)
    }

    fn query_rows<T>(
        &self,
        query: &str,
        params: &[QueryParam],
    ) -> impl Future<Output = SqlResult<Vec<T>>> + Send
    where
        T: DeserializeOwned + Send,
    {
        TxSession::query_rows(self, query, params)
    }

    fn query_rows_partial<T>(
        &self,
        query: &str,
        params: &[QueryParam],
    ) -> impl Future<Output = SqlResult<Vec<T>>> + Send
    where
        T: DeserializeOwned + Default + Serialize + Send,
    {
        TxSession::query_rows_partial(self, query, params)
    }
}
