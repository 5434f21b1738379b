//! Database driver layer.
//!
//! This module provides the sqlx-facing plumbing under the facade:
//! - Connection pool creation and the process-wide pool cache
//! - Statement execution against a pool or a transaction
//! - Parameter binding and row decoding
//! - Database dispatch macros for reducing code duplication

#[macro_use]
pub mod macros;
pub mod cache;
pub mod executor;
pub mod params;
pub mod pool;
pub mod transaction;
pub mod types;

pub use cache::{PoolCache, PoolKey};
pub use pool::DbPool;
pub use transaction::DbTransaction;
pub use types::JsonRow;
