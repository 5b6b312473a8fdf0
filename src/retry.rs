//! Bounded retries for idempotent reads.
//!
//! Only reads go through here (`findActive`, catalog lookups, method listings). Order
//! submission is never retried.

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;
use tokio::time::error::Elapsed;
use tracing::warn;

/// Failures worth another attempt (timeouts, unavailable actors or services).
pub trait Transient {
    fn is_transient(&self) -> bool;
}

/// Runs `call` up to `attempts` times while it fails transiently.
pub async fn retry_read<T, E, F, Fut>(attempts: u32, operation: &'static str, mut call: F) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Transient + Display,
{
    let attempts = attempts.max(1);
    let mut attempt = 1;
    loop {
        match call().await {
            Err(error) if error.is_transient() && attempt < attempts => {
                warn!(operation, attempt, %error, "Transient read failure, retrying");
                attempt += 1;
            }
            result => return result,
        }
    }
}

/// Timeout and attempt budget for one kind of read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadPolicy {
    pub timeout: Duration,
    pub attempts: u32,
}

impl ReadPolicy {
    /// Each attempt is cut off after `timeout`; an elapsed attempt counts as a transient failure.
    pub async fn run<T, E, F, Fut>(&self, operation: &'static str, mut call: F) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Transient + Display + From<Elapsed>,
    {
        let limit = self.timeout;
        retry_read(self.attempts, operation, || {
            let attempt = call();
            async move { tokio::time::timeout(limit, attempt).await? }
        })
        .await
    }
}
