//! sqlconn library
//!
//! A circuit-breaker guarded SQL facade over sqlx (SQLite, PostgreSQL, MySQL)
//! with master/slave read splitting and serde-based row marshaling.

pub mod config;
pub mod conn;
pub mod db;
pub mod error;
pub mod models;

pub use config::{DatasourceSet, PoolOptions, SqlConnConfig};
pub use conn::{Breaker, NopBreaker, Role, Session, SqlConn, StmtSession, TxSession};
pub use db::PoolCache;
pub use error::{SqlError, SqlResult};
pub use models::{DatabaseType, ExecResult, QueryParam};
