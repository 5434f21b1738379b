//! Error types for the SQL connection facade.
//!
//! Every operation returns [`SqlError`]. The variants are grouped by how the
//! breaker accounting treats them:
//!
//! - configuration errors (missing datasource roles, unknown driver) are
//!   returned to the caller and count as unhealthy outcomes
//! - expected outcomes (`NotFound`, `TxDone`) are returned to the caller but
//!   never count against datastore health
//! - datastore and transport failures count against datastore health unless a
//!   dialect strategy marks them benign
//! - `BreakerOpen` is synthesized by the breaker when it fails fast
//! - marshal failures (`NotMatchDestination`, `Scan`) are attributed to the
//!   destination shape, not the datastore

use thiserror::Error;

#[derive(Error, Debug)]
pub enum SqlError {
    #[error("sql: no rows in result set")]
    NotFound,

    #[error("sql: transaction has already been committed or rolled back")]
    TxDone,

    #[error("dataSource config master error")]
    MasterNotConfigured,

    #[error("dataSource config slave error")]
    SlaveNotConfigured,

    #[error("Unsupported driver: {driver}")]
    UnsupportedDriver { driver: String },

    #[error("Invalid configuration: {message}")]
    InvalidConfig { message: String },

    #[error("Database error: {message}")]
    Database {
        message: String,
        /// SQLSTATE for MySQL/PostgreSQL, extended result code for SQLite
        code: Option<String>,
        /// Vendor error number (MySQL only), e.g. 1062 for duplicate entry
        number: Option<u32>,
    },

    #[error("Connection failed: {message}")]
    Connection { message: String, suggestion: String },

    #[error("Timeout: {operation}")]
    Timeout { operation: String },

    #[error("circuit breaker is open: {name}")]
    BreakerOpen { name: String },

    #[error("not matching destination to scan, missing columns: {}", missing.join(", "))]
    NotMatchDestination { missing: Vec<String> },

    #[error("Scan error: {message}")]
    Scan { message: String },

    #[error("statement expects {expected} parameters, got {actual}")]
    ParamCount { expected: usize, actual: usize },

    #[error("transaction failed: {source}, rollback failed: {rollback}")]
    Rollback {
        source: Box<SqlError>,
        rollback: Box<SqlError>,
    },
}

impl SqlError {
    /// Create a connection error with a helpful suggestion.
    pub fn connection(message: impl Into<String>, suggestion: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
            suggestion: suggestion.into(),
        }
    }

    /// Create a database error.
    pub fn database(message: impl Into<String>, code: Option<String>, number: Option<u32>) -> Self {
        Self::Database {
            message: message.into(),
            code,
            number,
        }
    }

    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            message: message.into(),
        }
    }

    pub fn unsupported_driver(driver: impl Into<String>) -> Self {
        Self::UnsupportedDriver {
            driver: driver.into(),
        }
    }

    pub fn scan(message: impl Into<String>) -> Self {
        Self::Scan {
            message: message.into(),
        }
    }

    pub fn breaker_open(name: impl Into<String>) -> Self {
        Self::BreakerOpen { name: name.into() }
    }

    /// SQLSTATE or driver-specific code of a database error.
    pub fn code(&self) -> Option<&str> {
        match self {
            Self::Database { code, .. } => code.as_deref(),
            _ => None,
        }
    }

    /// MySQL vendor error number of a database error.
    pub fn number(&self) -> Option<u32> {
        match self {
            Self::Database { number, .. } => *number,
            _ => None,
        }
    }

    /// Get the suggestion for this error, if available.
    pub fn suggestion(&self) -> Option<&str> {
        match self {
            Self::Connection { suggestion, .. } => Some(suggestion),
            _ => None,
        }
    }

    /// True for failures produced while marshaling rows into a destination.
    pub fn is_scan_error(&self) -> bool {
        matches!(self, Self::NotMatchDestination { .. } | Self::Scan { .. })
    }

    /// True for errors caused by the datasource configuration.
    pub fn is_config_error(&self) -> bool {
        matches!(
            self,
            Self::MasterNotConfigured
                | Self::SlaveNotConfigured
                | Self::UnsupportedDriver { .. }
                | Self::InvalidConfig { .. }
        )
    }

    /// True when the breaker rejected the call without running it.
    pub fn is_breaker_open(&self) -> bool {
        matches!(self, Self::BreakerOpen { .. })
    }
}

/// Convert sqlx errors to SqlError.
impl From<sqlx::Error> for SqlError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => SqlError::NotFound,
            sqlx::Error::Configuration(msg) => SqlError::connection(
                msg.to_string(),
                "Check the connection string format and credentials",
            ),
            sqlx::Error::Database(db_err) => {
                let code = db_err.code().map(|c| c.to_string());
                let number = db_err
                    .try_downcast_ref::<sqlx::mysql::MySqlDatabaseError>()
                    .map(|e| u32::from(e.number()));
                SqlError::database(db_err.message(), code, number)
            }
            sqlx::Error::PoolTimedOut => SqlError::Timeout {
                operation: "connection pool acquire".to_string(),
            },
            sqlx::Error::PoolClosed => {
                SqlError::connection("Connection pool is closed", "Reconnect to the database")
            }
            sqlx::Error::Io(io_err) => SqlError::connection(
                format!("I/O error: {}", io_err),
                "Check network connectivity and database server status",
            ),
            sqlx::Error::Tls(tls_err) => SqlError::connection(
                format!("TLS error: {}", tls_err),
                "Verify TLS configuration and certificates",
            ),
            sqlx::Error::Protocol(msg) => SqlError::connection(
                format!("Protocol error: {}", msg),
                "Check database server compatibility",
            ),
            sqlx::Error::ColumnNotFound(col) => SqlError::scan(format!("Column not found: {}", col)),
            sqlx::Error::ColumnIndexOutOfBounds { index, len } => SqlError::scan(format!(
                "Column index {} out of bounds (len: {})",
                index, len
            )),
            sqlx::Error::ColumnDecode { index, source } => {
                SqlError::scan(format!("Failed to decode column {}: {}", index, source))
            }
            sqlx::Error::Decode(source) => SqlError::scan(format!("Decode error: {}", source)),
            sqlx::Error::WorkerCrashed => {
                SqlError::connection("Database worker crashed", "Reconnect to the database")
            }
            _ => SqlError::database(format!("Unknown database error: {}", err), None, None),
        }
    }
}

impl From<serde_json::Error> for SqlError {
    fn from(err: serde_json::Error) -> Self {
        SqlError::scan(err.to_string())
    }
}

/// Result type alias for facade operations.
pub type SqlResult<T> = Result<T, SqlError>;
