//! Shared helpers for integration tests.

#![allow(dead_code)]

use sqlconn::{Breaker, DatasourceSet, SqlConn};
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

/// SQLite datasource URL for a file inside `dir`.
pub fn sqlite_url(dir: &Path, name: &str) -> String {
    format!("sqlite:{}", dir.join(name).display())
}

/// Facade pointed at a single SQLite file, cluster mode off.
pub fn single(url: &str) -> SqlConn {
    SqlConn::new("sqlite", DatasourceSet::new(url), false).unwrap()
}

/// Create `users` in the SQLite file at `url` and insert the given names.
pub async fn seed_users(url: &str, names: &[&str]) {
    let conn = single(url);
    conn.exec(
        "CREATE TABLE IF NOT EXISTS users (
            id INTEGER PRIMARY KEY,
            name TEXT NOT NULL UNIQUE,
            age INTEGER
        )",
        &[],
    )
    .await
    .unwrap();
    for name in names {
        conn.exec("INSERT INTO users (name, age) VALUES (?, ?)", &[(*name).into(), 30.into()])
            .await
            .unwrap();
    }
    conn.pool_cache().close_all().await;
}

/// Breaker that records every health mark and can be forced open.
#[derive(Debug, Default)]
pub struct RecordingBreaker {
    open: AtomicBool,
    successes: AtomicUsize,
    failures: AtomicUsize,
}

impl RecordingBreaker {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn set_open(&self, open: bool) {
        self.open.store(open, Ordering::SeqCst);
    }

    pub fn successes(&self) -> usize {
        self.successes.load(Ordering::SeqCst)
    }

    pub fn failures(&self) -> usize {
        self.failures.load(Ordering::SeqCst)
    }

    /// (successes, failures)
    pub fn marks(&self) -> (usize, usize) {
        (self.successes(), self.failures())
    }
}

impl Breaker for RecordingBreaker {
    fn name(&self) -> &str {
        "recording"
    }

    fn allow(&self) -> bool {
        !self.open.load(Ordering::SeqCst)
    }

    fn mark_success(&self) {
        self.successes.fetch_add(1, Ordering::SeqCst);
    }

    fn mark_failure(&self) {
        self.failures.fetch_add(1, Ordering::SeqCst);
    }
}
