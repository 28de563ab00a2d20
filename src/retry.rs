//! Bounded retry combinator.
//!
//! Rendering a JavaScript-heavy page fails often enough (navigation
//! timeouts, half-loaded listings that extract to garbage) that every page
//! gets a few attempts. [`with_retries`] runs an async operation until it
//! succeeds or the attempt budget is spent, logging each failure.
//!
//! Unlike exponential backoff for rate-limited APIs, retries here are
//! immediate by default: the renderer already waits for the page to settle.

use std::fmt::Display;
use std::future::Future;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::time::sleep;
use tracing::{error, warn};

/// How many times to try and how long to pause between tries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first one. Always at least 1.
    pub max_attempts: u32,
    /// Pause after a failed attempt.
    pub delay: Duration,
}

impl RetryPolicy {
    pub fn immediate(max_attempts: u32) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            delay: Duration::ZERO,
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::immediate(3)
    }
}

/// Returned once every attempt failed.
#[derive(Debug, Error)]
#[error("gave up after {attempts} attempt(s): {last}")]
pub struct RetryExhausted<E> {
    pub attempts: u32,
    pub last: E,
}

/// Run `operation` until it succeeds or `policy.max_attempts` is reached.
///
/// The closure receives the 1-based attempt number so callers can size
/// per-attempt budgets or tag logs. `label` identifies the operation in
/// log lines (typically the URL).
pub async fn with_retries<T, E, F, Fut>(
    policy: RetryPolicy,
    label: &str,
    mut operation: F,
) -> Result<T, RetryExhausted<E>>
where
    E: Display,
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let max_attempts = policy.max_attempts.max(1);
    let total_t0 = Instant::now();
    let mut attempt = 0u32;

    loop {
        attempt += 1;
        let attempt_t0 = Instant::now();
        match operation(attempt).await {
            Ok(value) => return Ok(value),
            Err(e) => {
                if attempt >= max_attempts {
                    error!(
                        %label,
                        attempt,
                        max_attempts,
                        elapsed_ms_total = total_t0.elapsed().as_millis() as u64,
                        error = %e,
                        "Exhausted retries"
                    );
                    return Err(RetryExhausted { attempts: attempt, last: e });
                }

                warn!(
                    %label,
                    attempt,
                    max_attempts,
                    elapsed_ms_attempt = attempt_t0.elapsed().as_millis() as u64,
                    error = %e,
                    "Attempt failed; retrying"
                );
                if !policy.delay.is_zero() {
                    sleep(policy.delay).await;
                }
            }
        }
    }
}
