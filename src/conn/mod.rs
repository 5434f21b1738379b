//! The connection facade.
//!
//! - `router`: picks master or slave from the leading SQL verb
//! - `accept`: decides which errors count against datastore health
//! - `breaker`: the circuit breaker contract the facade calls through
//! - `marshal`: scans decoded rows into caller types
//! - `sql_conn`, `session`, `statement`: the facade and its sessions

pub mod accept;
pub mod breaker;
pub mod marshal;
pub mod router;
pub mod session;
pub mod slow;
pub mod sql_conn;
pub mod statement;

pub use accept::{AcceptFn, Acceptable, Dialect, base_acceptable};
pub use breaker::{Breaker, NopBreaker, do_with_acceptable};
pub use router::Role;
pub use session::{Session, TxSession};
pub use sql_conn::SqlConn;
pub use statement::StmtSession;
