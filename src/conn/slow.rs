//! Slow statement logging.

use std::time::{Duration, Instant};
use tracing::warn;

/// Warns about statements that ran longer than a threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlowLog {
    threshold: Option<Duration>,
}

impl SlowLog {
    /// `None` disables slow logging.
    pub fn new(threshold: Option<Duration>) -> Self {
        Self { threshold }
    }

    pub fn threshold(&self) -> Option<Duration> {
        self.threshold
    }

    pub fn is_slow(&self, elapsed: Duration) -> bool {
        self.threshold.is_some_and(|threshold| elapsed > threshold)
    }

    /// Log `sql` if it has been running since `started` for too long.
    pub fn observe(&self, sql: &str, started: Instant) {
        let elapsed = started.elapsed();
        if self.is_slow(elapsed) {
            warn!(
                sql = %sql,
                elapsed_ms = elapsed.as_millis() as u64,
                "Slow query"
            );
        }
    }
}
