//! Circuit breaker contract.
//!
//! The facade only needs a guard that can refuse a call and record how a call
//! went. Any statistics or state machine lives behind [`Breaker`].

use crate::error::{SqlError, SqlResult};
use std::future::Future;
use tracing::debug;

/// A shared circuit breaker. Implementations must tolerate concurrent marks.
pub trait Breaker: Send + Sync {
    /// Name reported in [`SqlError::BreakerOpen`].
    fn name(&self) -> &str;

    /// Whether a call may proceed. Returning false fails the call fast.
    fn allow(&self) -> bool;

    fn mark_success(&self);

    fn mark_failure(&self);
}

/// Breaker that never opens and records nothing.
#[derive(Debug, Clone, Default)]
pub struct NopBreaker {
    name: String,
}

impl NopBreaker {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl Breaker for NopBreaker {
    fn name(&self) -> &str {
        &self.name
    }

    fn allow(&self) -> bool {
        true
    }

    fn mark_success(&self) {}

    fn mark_failure(&self) {}
}

/// Run `work` under `breaker`.
///
/// When the breaker refuses, `work` is never polled and `BreakerOpen` is
/// returned. Otherwise the outcome is marked healthy on success or when
/// `acceptable` accepts the error, and the error itself is returned unchanged.
pub async fn do_with_acceptable<T, Fut, A>(
    breaker: &dyn Breaker,
    work: Fut,
    acceptable: A,
) -> SqlResult<T>
where
    Fut: Future<Output = SqlResult<T>>,
    A: FnOnce(&SqlError) -> bool,
{
    if !breaker.allow() {
        debug!(breaker = breaker.name(), "Breaker open, rejecting call");
        return Err(SqlError::breaker_open(breaker.name()));
    }

    let result = work.await;
    match &result {
        Ok(_) => breaker.mark_success(),
        Err(err) if acceptable(err) => breaker.mark_success(),
        Err(_) => breaker.mark_failure(),
    }
    result
}
