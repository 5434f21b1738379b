//! Integration tests for master/slave routing.

mod common;

use common::{RecordingBreaker, seed_users, single, sqlite_url};
use sqlconn::{DatasourceSet, Role, SqlConn, SqlError};

struct Cluster {
    _dir: tempfile::TempDir,
    master: String,
    slave: String,
}

/// Two SQLite files whose `users` tables hold different rows, so every read
/// shows which datasource served it.
async fn cluster() -> Cluster {
    let dir = tempfile::tempdir().unwrap();
    let master = sqlite_url(dir.path(), "master.db");
    let slave = sqlite_url(dir.path(), "slave.db");
    seed_users(&master, &["on-master"]).await;
    seed_users(&slave, &["on-slave"]).await;
    Cluster {
        _dir: dir,
        master,
        slave,
    }
}

#[tokio::test]
async fn test_cluster_reads_from_slave() {
    let c = cluster().await;
    let conn = SqlConn::new(
        "sqlite",
        DatasourceSet::new(&c.master).with_slave(&c.slave),
        true,
    )
    .unwrap();

    let name: String = conn
        .query_row("SELECT name FROM users", &[])
        .await
        .unwrap();
    assert_eq!(name, "on-slave");

    // Lower-case verb and surrounding whitespace are normalized
    let name: String = conn
        .query_row("  select name from users  ", &[])
        .await
        .unwrap();
    assert_eq!(name, "on-slave");
}

#[tokio::test]
async fn test_cluster_writes_go_to_master() {
    let c = cluster().await;
    let conn = SqlConn::new(
        "sqlite",
        DatasourceSet::new(&c.master).with_slave(&c.slave),
        true,
    )
    .unwrap();

    let result = conn
        .exec("INSERT INTO users (name) VALUES (?)", &["written".into()])
        .await
        .unwrap();
    assert_eq!(result.rows_affected, 1);

    let on_master: Vec<String> = single(&c.master)
        .query_rows("SELECT name FROM users ORDER BY id", &[])
        .await
        .unwrap();
    assert_eq!(on_master, vec!["on-master", "written"]);

    let on_slave: Vec<String> = single(&c.slave)
        .query_rows("SELECT name FROM users ORDER BY id", &[])
        .await
        .unwrap();
    assert_eq!(on_slave, vec!["on-slave"]);
}

#[tokio::test]
async fn test_cluster_non_select_reads_go_to_master() {
    let c = cluster().await;
    let conn = SqlConn::new(
        "sqlite",
        DatasourceSet::new(&c.master).with_slave(&c.slave),
        true,
    )
    .unwrap();

    // Read-only CTEs are not recognised as reads
    let name: String = conn
        .query_row("WITH u AS (SELECT name FROM users) SELECT name FROM u", &[])
        .await
        .unwrap();
    assert_eq!(name, "on-master");

    let name: String = conn
        .query_row("/* replica? */ SELECT name FROM users", &[])
        .await
        .unwrap();
    assert_eq!(name, "on-master");
}

#[tokio::test]
async fn test_non_cluster_reads_from_master_even_with_slave() {
    let c = cluster().await;
    let conn = SqlConn::new(
        "sqlite",
        DatasourceSet::new(&c.master).with_slave(&c.slave),
        false,
    )
    .unwrap();

    let name: String = conn
        .query_row("SELECT name FROM users", &[])
        .await
        .unwrap();
    assert_eq!(name, "on-master");
    assert_eq!(conn.route("SELECT 1").unwrap(), Role::Master);
}

#[tokio::test]
async fn test_missing_slave_is_a_distinct_unhealthy_error() {
    let c = cluster().await;
    let brk = RecordingBreaker::new();
    let conn = SqlConn::new("sqlite", DatasourceSet::new(&c.master), true)
        .unwrap()
        .with_breaker(brk.clone());

    let err = conn
        .query_row::<String>("SELECT name FROM users", &[])
        .await
        .unwrap_err();
    assert!(matches!(err, SqlError::SlaveNotConfigured));
    assert_eq!(err.to_string(), "dataSource config slave error");
    assert_eq!(brk.marks(), (0, 1));

    // Writes still reach the master
    conn.exec("DELETE FROM users", &[]).await.unwrap();
    assert_eq!(brk.marks(), (1, 1));
}

#[tokio::test]
async fn test_missing_master_is_a_distinct_unhealthy_error() {
    let brk = RecordingBreaker::new();
    let conn = SqlConn::new("sqlite", DatasourceSet::default(), false)
        .unwrap()
        .with_breaker(brk.clone());

    let err = conn.exec("DELETE FROM users", &[]).await.unwrap_err();
    assert!(matches!(err, SqlError::MasterNotConfigured));
    assert_eq!(err.to_string(), "dataSource config master error");
    assert_eq!(brk.marks(), (0, 1));

    let err = conn
        .transact(|_tx| Box::pin(async { Ok(()) }))
        .await
        .unwrap_err();
    assert!(matches!(err, SqlError::MasterNotConfigured));
    assert_eq!(brk.marks(), (0, 2));
}

#[test]
fn test_unsupported_driver() {
    let err = SqlConn::new("oracle", DatasourceSet::new("oracle://db"), false).unwrap_err();
    assert!(matches!(err, SqlError::UnsupportedDriver { .. }));
}
