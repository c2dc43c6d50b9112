//! Retry with exponential backoff
//!
//! [`BackoffExecutor`] runs a fallible async operation up to
//! `max_attempts` times. Between attempts it sleeps
//! `unit * backoff_multiplier^n`, where `n` is the 0-based retry index, so with a
//! multiplier of 2 the waits are 1, 2, 4, ... units. Whether an error is worth
//! retrying is decided per error value, either by a caller-supplied predicate or
//! by the error's own [`Classify`] implementation.
//!
//! When every attempt fails (or a non-retryable error shows up), the policy
//! decides what the caller sees: in strict mode the last error wrapped in a
//! [`RetryError`], in graceful-degradation mode `Ok(None)`.

use std::fmt;
use std::future::Future;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Default length of one backoff unit
const DEFAULT_UNIT: Duration = Duration::from_secs(1);

/// How an error should be treated by the retry loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Likely to go away on its own (network hiccup, rate limit, 5xx)
    Transient,
    /// Retrying cannot help (bad request, auth failure, malformed response)
    Permanent,
    /// Not enough information to tell
    Unknown,
}

/// Errors that know whether they are worth retrying
pub trait Classify {
    fn classify(&self) -> ErrorClass;

    /// Only transient errors are retried; unknown ones surface immediately.
    fn is_retryable(&self) -> bool {
        self.classify() == ErrorClass::Transient
    }
}

/// Retry behaviour, usually loaded from the `[retry]` config section
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RetryPolicy {
    /// Total number of attempts, including the first one
    pub max_attempts: u32,
    /// Base of the exponential delay between attempts
    pub backoff_multiplier: u32,
    /// Turn terminal failures into `Ok(None)` instead of an error
    pub graceful_degradation: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff_multiplier: 2,
            graceful_degradation: true,
        }
    }
}

/// Terminal failure of a retried operation in strict mode
#[derive(Debug)]
pub struct RetryError<E> {
    /// Number of times the operation ran
    pub attempts: u32,
    /// True if the loop stopped because attempts ran out, false if the last
    /// error was not retryable
    pub exhausted: bool,
    /// The error returned by the final attempt, unchanged
    pub source: E,
}

impl<E> RetryError<E> {
    pub fn into_source(self) -> E {
        self.source
    }
}

impl<E: fmt::Display> fmt::Display for RetryError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.exhausted {
            write!(f, "gave up after {} attempt(s): {}", self.attempts, self.source)
        } else {
            write!(
                f,
                "non-retryable error on attempt {}: {}",
                self.attempts, self.source
            )
        }
    }
}

impl<E: std::error::Error + 'static> std::error::Error for RetryError<E> {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.source)
    }
}

/// Runs operations under a [`RetryPolicy`]
#[derive(Debug, Clone)]
pub struct BackoffExecutor {
    policy: RetryPolicy,
    /// Length of one backoff unit
    unit: Duration,
}

impl BackoffExecutor {
    /// Creates an executor whose backoff unit is one second
    pub fn new(policy: RetryPolicy) -> Self {
        Self {
            policy,
            unit: DEFAULT_UNIT,
        }
    }

    /// Overrides the backoff unit
    pub fn with_unit(mut self, unit: Duration) -> Self {
        self.unit = unit;
        self
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Delay before retry number `retry` (0-based): `unit * multiplier^retry`.
    ///
    /// Saturates instead of overflowing for large multipliers.
    pub fn delay_for(&self, retry: u32) -> Duration {
        let factor = self
            .policy
            .backoff_multiplier
            .max(1)
            .checked_pow(retry)
            .unwrap_or(u32::MAX);
        self.unit.saturating_mul(factor)
    }

    /// Runs `operation`, retrying failures for which `is_retryable` returns true.
    ///
    /// # Returns
    /// * `Ok(Some(value))` - an attempt succeeded
    /// * `Ok(None)` - every attempt failed and the policy degrades gracefully;
    ///   callers cannot tell this apart from "no data"
    /// * `Err(RetryError)` - every attempt failed in strict mode, or a
    ///   non-retryable error occurred
    pub async fn execute<T, E, F, Fut, P>(
        &self,
        mut operation: F,
        is_retryable: P,
    ) -> Result<Option<T>, RetryError<E>>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        P: Fn(&E) -> bool,
        E: fmt::Display,
    {
        let max_attempts = self.policy.max_attempts.max(1);
        let mut attempt = 0;

        loop {
            attempt += 1;

            let error = match operation().await {
                Ok(value) => {
                    if attempt > 1 {
                        debug!(attempt, "Operation succeeded after retrying");
                    }
                    return Ok(Some(value));
                }
                Err(error) => error,
            };

            let retryable = is_retryable(&error);
            if retryable && attempt < max_attempts {
                let delay = self.delay_for(attempt - 1);
                warn!(
                    attempt,
                    max_attempts,
                    delay_ms = delay.as_millis() as u64,
                    error = %error,
                    "Attempt failed, retrying"
                );
                tokio::time::sleep(delay).await;
                continue;
            }

            return self.resolve_failure(RetryError {
                attempts: attempt,
                exhausted: retryable,
                source: error,
            });
        }
    }

    /// Like [`execute`](Self::execute), using the error's own classification
    pub async fn execute_classified<T, E, F, Fut>(
        &self,
        operation: F,
    ) -> Result<Option<T>, RetryError<E>>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Classify + fmt::Display,
    {
        self.execute(operation, |e: &E| e.is_retryable()).await
    }

    fn resolve_failure<T, E: fmt::Display>(
        &self,
        failure: RetryError<E>,
    ) -> Result<Option<T>, RetryError<E>> {
        if self.policy.graceful_degradation {
            warn!(error = %failure, "Degrading to an empty result");
            Ok(None)
        } else {
            Err(failure)
        }
    }
}
