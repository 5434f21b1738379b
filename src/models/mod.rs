//! Data models shared by the driver layer and the connection facade.

pub mod connection;
pub mod query;

pub use connection::DatabaseType;
pub use query::{ExecResult, QueryParam};
