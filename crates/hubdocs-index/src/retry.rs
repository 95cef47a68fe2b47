//! Bounded retry with a fixed backoff.

use std::fmt::Display;
use std::time::Duration;

/// How often and how patiently to retry a failing operation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first one. Never less than 1.
    pub attempts: u32,
    /// Pause between consecutive attempts.
    pub backoff: Duration,
}

/// Terminal failure after the retry budget is spent.
#[derive(Debug, thiserror::Error)]
#[error("{operation} failed after {attempts} attempts: {source}")]
pub struct RetryError<E> {
    /// Operation label used in logs and messages.
    pub operation: String,
    /// Attempts made.
    pub attempts: u32,
    /// Error of the last attempt.
    pub source: E,
}

impl RetryPolicy {
    /// Create a policy; `attempts` is clamped to at least one.
    #[must_use]
    pub fn new(attempts: u32, backoff: Duration) -> Self {
        Self {
            attempts: attempts.max(1),
            backoff,
        }
    }

    /// Run `f` until it succeeds or the attempt budget is spent.
    ///
    /// Sleeps for `backoff` between attempts, never after the last one.
    pub fn run<T, E, F>(&self, operation: &str, mut f: F) -> Result<T, RetryError<E>>
    where
        E: Display,
        F: FnMut() -> Result<T, E>,
    {
        let attempts = self.attempts.max(1);
        let mut attempt = 1;
        loop {
            match f() {
                Ok(value) => return Ok(value),
                Err(err) if attempt >= attempts => {
                    tracing::error!(operation, attempts, error = %err, "retries exhausted");
                    return Err(RetryError {
                        operation: operation.to_owned(),
                        attempts,
                        source: err,
                    });
                }
                Err(err) => {
                    tracing::warn!(operation, attempt, error = %err, "attempt failed, retrying");
                    attempt += 1;
                    if !self.backoff.is_zero() {
                        std::thread::sleep(self.backoff);
                    }
                }
            }
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(3, Duration::from_secs(1))
    }
}
