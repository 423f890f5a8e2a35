//! Bounded retry with jittered exponential backoff.

use rand::Rng;
use std::future::Future;
use std::time::Duration;
use tracing::debug;

use crate::config::DownloadConfig;

/// How many times to try and how long to wait in between.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first one. Never less than 1.
    pub attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl RetryPolicy {
    pub fn new(attempts: u32, base_delay: Duration, max_delay: Duration) -> Self {
        Self {
            attempts: attempts.max(1),
            base_delay,
            max_delay: max_delay.max(base_delay),
        }
    }

    /// A policy that never sleeps, for tests.
    pub fn immediate(attempts: u32) -> Self {
        Self::new(attempts, Duration::ZERO, Duration::ZERO)
    }

    pub fn from_download_config(config: &DownloadConfig) -> Self {
        Self::new(
            config.retry_count,
            Duration::from_millis(config.backoff_base_ms),
            Duration::from_millis(config.backoff_max_ms),
        )
    }

    /// Upper bound of the delay after the given (1-based) failed attempt.
    pub fn delay_ceiling(&self, attempt: u32) -> Duration {
        let factor = 1u32.checked_shl(attempt.saturating_sub(1)).unwrap_or(u32::MAX);
        self.base_delay.saturating_mul(factor).min(self.max_delay)
    }

    /// Full jitter: uniform in `[0, ceiling]`.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let ceiling = self.delay_ceiling(attempt);
        if ceiling.is_zero() {
            return ceiling;
        }
        let millis = rand::thread_rng().gen_range(0..=ceiling.as_millis() as u64);
        Duration::from_millis(millis)
    }
}

/// Failure report from [`retry`]: every error seen, oldest first.
#[derive(Debug)]
pub struct RetryExhausted<E> {
    pub errors: Vec<E>,
}

impl<E> RetryExhausted<E> {
    pub fn last(&self) -> Option<&E> {
        self.errors.last()
    }
}

/// Run `op` until it succeeds, a non-retryable error occurs, or the policy
/// runs out of attempts.
pub async fn retry<T, E, F, Fut>(
    policy: RetryPolicy,
    label: &str,
    is_retryable: impl Fn(&E) -> bool,
    mut op: F,
) -> Result<T, RetryExhausted<E>>
where
    E: std::fmt::Display,
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let mut errors = Vec::new();

    for attempt in 1..=policy.attempts {
        match op(attempt).await {
            Ok(value) => return Ok(value),
            Err(e) => {
                let retryable = is_retryable(&e);
                debug!(
                    label,
                    attempt,
                    max_attempts = policy.attempts,
                    retryable,
                    error = %e,
                    "Attempt failed"
                );
                errors.push(e);

                if !retryable || attempt == policy.attempts {
                    break;
                }

                let delay = policy.delay_for(attempt);
                if !delay.is_zero() {
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }

    Err(RetryExhausted { errors })
}
