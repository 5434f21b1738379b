//! Which errors count against datastore health.
//!
//! An accepted error is still returned to the caller. Acceptance only decides
//! whether the breaker records the call as healthy.

use crate::error::SqlError;
use crate::models::DatabaseType;
use std::fmt;
use std::sync::Arc;

/// Extra acceptance rule installed at construction.
pub type AcceptFn = Arc<dyn Fn(&SqlError) -> bool + Send + Sync>;

/// MySQL `ER_DUP_ENTRY`.
pub const MYSQL_DUPLICATE_ENTRY: u32 = 1062;
/// PostgreSQL `unique_violation`.
pub const POSTGRES_UNIQUE_VIOLATION: &str = "23505";
/// SQLite `SQLITE_CONSTRAINT_UNIQUE`.
pub const SQLITE_CONSTRAINT_UNIQUE: &str = "2067";
/// SQLite `SQLITE_CONSTRAINT_PRIMARYKEY`.
pub const SQLITE_CONSTRAINT_PRIMARYKEY: &str = "1555";

/// Outcomes that never reflect datastore health: an empty result set and a
/// transaction that was already finished.
pub fn base_acceptable(err: &SqlError) -> bool {
    matches!(err, SqlError::NotFound | SqlError::TxDone)
}

/// Duplicate-key detection per dialect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    MySql,
    Postgres,
    Sqlite,
}

impl Dialect {
    pub fn for_database(db_type: DatabaseType) -> Self {
        match db_type {
            DatabaseType::MySQL => Dialect::MySql,
            DatabaseType::PostgreSQL => Dialect::Postgres,
            DatabaseType::SQLite => Dialect::Sqlite,
        }
    }

    /// True when `err` is this dialect's unique-constraint violation.
    pub fn is_duplicate_key(&self, err: &SqlError) -> bool {
        match self {
            Dialect::MySql => err.number() == Some(MYSQL_DUPLICATE_ENTRY),
            Dialect::Postgres => err.code() == Some(POSTGRES_UNIQUE_VIOLATION),
            Dialect::Sqlite => matches!(
                err.code(),
                Some(SQLITE_CONSTRAINT_UNIQUE) | Some(SQLITE_CONSTRAINT_PRIMARYKEY)
            ),
        }
    }
}

/// Acceptance policy: the base rule OR an optional extension.
#[derive(Clone, Default)]
pub struct Acceptable {
    extension: Option<AcceptFn>,
}

impl Acceptable {
    /// Base rule only.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_extension(extension: AcceptFn) -> Self {
        Self {
            extension: Some(extension),
        }
    }

    /// Base rule plus the dialect's duplicate-key rule.
    pub fn for_dialect(dialect: Dialect) -> Self {
        Self::with_extension(Arc::new(move |err: &SqlError| dialect.is_duplicate_key(err)))
    }

    pub fn has_extension(&self) -> bool {
        self.extension.is_some()
    }

    /// Classification for exec, prepare and transact.
    pub fn accept(&self, err: &SqlError) -> bool {
        base_acceptable(err) || self.extension.as_ref().is_some_and(|ext| ext(err))
    }

    /// Classification for query operations: scan failures are attributed to
    /// the destination, not the datastore.
    pub fn accept_query(&self, err: &SqlError) -> bool {
        self.accept(err) || err.is_scan_error()
    }
}

impl fmt::Debug for Acceptable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Acceptable")
            .field("extension", &self.extension.is_some())
            .finish()
    }
}
