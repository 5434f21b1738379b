//! Read/write splitting by leading SQL verb.
//!
//! This is a syntactic heuristic, not a parser. Only statements whose first
//! token is `SELECT` go to the replica; CTEs, parenthesized selects and
//! statements starting with a comment all go to the primary.

use crate::config::DatasourceSet;
use crate::error::{SqlError, SqlResult};
use serde::Serialize;
use tracing::debug;

/// Which datasource role a statement was routed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Master,
    Slave,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Master => crate::config::MASTER_ROLE,
            Role::Slave => crate::config::SLAVE_ROLE,
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Uppercased first whitespace-delimited token of the trimmed query.
///
/// A query with no whitespace is its own verb, so a bare `select` is `SELECT`.
pub fn leading_verb(query: &str) -> String {
    query
        .split_whitespace()
        .next()
        .unwrap_or_default()
        .to_ascii_uppercase()
}

/// Role a query is sent to, before checking that the role is configured.
pub fn role_for(query: &str, cluster: bool) -> Role {
    if cluster && leading_verb(query) == "SELECT" {
        Role::Slave
    } else {
        Role::Master
    }
}

/// Resolve `query` to a datasource string.
///
/// Without cluster mode every query goes to master, even when a slave is
/// configured.
pub fn resolve<'a>(
    query: &str,
    cluster: bool,
    datasources: &'a DatasourceSet,
) -> SqlResult<(Role, &'a str)> {
    let role = role_for(query, cluster);
    debug!(cluster = cluster, role = %role, "Routing query");

    match role {
        Role::Master => datasources
            .master()
            .map(|ds| (role, ds))
            .ok_or(SqlError::MasterNotConfigured),
        Role::Slave => datasources
            .slave()
            .map(|ds| (role, ds))
            .ok_or(SqlError::SlaveNotConfigured),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn both() -> DatasourceSet {
        DatasourceSet::new("sqlite:master.db").with_slave("sqlite:slave.db")
    }

    #[test]
    fn test_leading_verb() {
        assert_eq!(leading_verb("  select * from t"), "SELECT");
        assert_eq!(leading_verb("INSERT\tINTO t VALUES (1)"), "INSERT");
        assert_eq!(leading_verb("select"), "SELECT");
        assert_eq!(leading_verb("   "), "");
    }

    #[test]
    fn test_cluster_routes_select_to_slave() {
        let ds = both();
        for query in [
            "SELECT 1",
            "select * from users",
            "  SeLeCt id FROM t  ",
            "SELECT\n*\nFROM t",
        ] {
            let (role, target) = resolve(query, true, &ds).unwrap();
            assert_eq!(role, Role::Slave, "{query}");
            assert_eq!(target, "sqlite:slave.db");
        }
    }

    #[test]
    fn test_cluster_routes_everything_else_to_master() {
        let ds = both();
        for query in [
            "INSERT INTO t VALUES (1)",
            "UPDATE t SET a = 1",
            "DELETE FROM t",
            "WITH x AS (SELECT 1) SELECT * FROM x",
            "(SELECT 1)",
            "/* read */ SELECT 1",
            "-- read\nSELECT 1",
            "SELECT* FROM t",
        ] {
            let (role, target) = resolve(query, true, &ds).unwrap();
            assert_eq!(role, Role::Master, "{query}");
            assert_eq!(target, "sqlite:master.db");
        }
    }

    #[test]
    fn test_non_cluster_always_routes_to_master() {
        let ds = both();
        for query in ["SELECT 1", "INSERT INTO t VALUES (1)", ""] {
            let (role, target) = resolve(query, false, &ds).unwrap();
            assert_eq!(role, Role::Master);
            assert_eq!(target, "sqlite:master.db");
        }
    }

    #[test]
    fn test_missing_slave_and_missing_master_are_distinct() {
        let master_only = DatasourceSet::new("sqlite:master.db");
        let slave_err = resolve("SELECT 1", true, &master_only).unwrap_err();
        assert!(matches!(slave_err, SqlError::SlaveNotConfigured));

        let empty = DatasourceSet::default();
        let master_err = resolve("UPDATE t SET a = 1", true, &empty).unwrap_err();
        assert!(matches!(master_err, SqlError::MasterNotConfigured));

        assert_ne!(slave_err.to_string(), master_err.to_string());
        assert_eq!(slave_err.to_string(), "dataSource config slave error");
        assert_eq!(master_err.to_string(), "dataSource config master error");
    }

    #[test]
    fn test_master_only_serves_writes_in_cluster_mode() {
        let master_only = DatasourceSet::new("sqlite:master.db");
        let (role, _) = resolve("INSERT INTO t VALUES (1)", true, &master_only).unwrap();
        assert_eq!(role, Role::Master);
    }
}
