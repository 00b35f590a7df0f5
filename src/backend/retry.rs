//! Generic execute-with-backoff wrapper
//!
//! The driver knows nothing about what the operation does; it only reacts
//! to the verdict each attempt reports. Exhausting every attempt on a
//! Transient verdict is reported as `Exhausted`, which is distinct from
//! `Permanent` so the orchestrator can queue the URL for its second pass.

use super::Verdict;
use std::future::Future;
use std::time::Duration;

/// Backoff parameters for one retried operation
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Total attempts, including the first (always at least 1)
    pub max_attempts: u32,

    /// Base delay; doubles after each transient failure
    pub base_delay: Duration,

    /// Ceiling for the exponential term, applied before jitter
    pub max_backoff: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, base_delay: Duration, max_backoff: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
            max_backoff,
        }
    }

    /// Delay to sleep after attempt `attempt` (1-based) fails transiently
    ///
    /// `base_delay * 2^(attempt-1)`, capped at `max_backoff`, plus a
    /// uniform random jitter of up to one `base_delay`.
    pub fn backoff_delay(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(32);
        let exponential = self.base_delay.as_secs_f64() * 2f64.powi(exponent as i32);
        let capped = exponential.min(self.max_backoff.as_secs_f64());
        let jitter = fastrand::f64() * self.base_delay.as_secs_f64();
        Duration::from_secs_f64(capped + jitter)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 6,
            base_delay: Duration::from_secs(1),
            max_backoff: Duration::from_secs(32),
        }
    }
}

impl From<&crate::config::RetryConfig> for RetryPolicy {
    /// `max-retries` counts retries after the first try, so attempts are
    /// one more than that
    fn from(config: &crate::config::RetryConfig) -> Self {
        Self::new(
            config.max_retries.saturating_add(1),
            Duration::from_secs_f64(config.base_delay_secs),
            Duration::from_secs_f64(config.max_backoff_secs),
        )
    }
}

/// Final verdict after the driver has finished with an operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FinalVerdict {
    /// An attempt succeeded
    Success,

    /// An attempt failed permanently; no retries were spent on it
    Permanent,

    /// Every attempt failed transiently
    Exhausted,
}

impl FinalVerdict {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success)
    }

    pub fn is_exhausted(&self) -> bool {
        matches!(self, Self::Exhausted)
    }
}

/// Result of running an operation under the retry driver
#[derive(Debug, Clone)]
pub struct RetryOutcome<T> {
    /// Value produced by the last attempt
    pub value: T,

    /// How the driver finished
    pub verdict: FinalVerdict,

    /// Attempts made; backoff sleeps observed equal `attempts - 1` unless
    /// the run ended on a Permanent verdict or a first-try success
    pub attempts: u32,
}

/// Runs `operation` under the backoff policy until it succeeds, fails
/// permanently, or runs out of attempts
///
/// The operation receives the 1-based attempt number and returns the
/// attempt's value together with its classification.
pub async fn with_retry<T, F, Fut>(policy: &RetryPolicy, mut operation: F) -> RetryOutcome<T>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = (T, Verdict)>,
{
    let mut attempt = 1u32;
    loop {
        let (value, verdict) = operation(attempt).await;
        match verdict {
            Verdict::Success => {
                return RetryOutcome {
                    value,
                    verdict: FinalVerdict::Success,
                    attempts: attempt,
                };
            }
            Verdict::Permanent => {
                return RetryOutcome {
                    value,
                    verdict: FinalVerdict::Permanent,
                    attempts: attempt,
                };
            }
            Verdict::Transient => {
                if attempt >= policy.max_attempts {
                    return RetryOutcome {
                        value,
                        verdict: FinalVerdict::Exhausted,
                        attempts: attempt,
                    };
                }
                let delay = policy.backoff_delay(attempt);
                tracing::debug!(
                    "transient failure on attempt {}/{}, backing off {:?}",
                    attempt,
                    policy.max_attempts,
                    delay
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
        }
    }
}
