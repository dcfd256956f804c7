//! Retry logic with exponential backoff
//!
//! This module provides the retry policy used by the HTTP client. Transient failures
//! (network errors, rate limiting, server errors) are retried with exponential backoff
//! capped at a maximum delay. A server-provided `Retry-After` hint replaces the computed
//! delay for the attempt it was sent on.
//!
//! Sleeping goes through the [`Sleeper`] trait so tests can substitute a simulated clock.
//!
//! # Example
//!
//! ```no_run
//! use jira_scrape::retry::{IsRetryable, TokioSleeper, with_retry};
//! use jira_scrape::config::RetryConfig;
//!
//! #[derive(Debug)]
//! enum MyError {
//!     Transient,
//!     Permanent,
//! }
//!
//! impl std::fmt::Display for MyError {
//!     fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
//!         write!(f, "{:?}", self)
//!     }
//! }
//!
//! impl IsRetryable for MyError {
//!     fn is_retryable(&self) -> bool {
//!         matches!(self, MyError::Transient)
//!     }
//! }
//!
//! # async fn example() -> Result<(), MyError> {
//! let config = RetryConfig::default();
//! with_retry(&config, &TokioSleeper, || async {
//!     // Your operation here
//!     Ok::<_, MyError>(())
//! })
//! .await?;
//! # Ok(())
//! # }
//! ```

use crate::config::RetryConfig;
use crate::error::Error;
use async_trait::async_trait;
use rand::Rng;
use std::future::Future;
use std::time::Duration;

/// HTTP statuses treated as transient
pub const RETRYABLE_STATUSES: [u16; 5] = [429, 500, 502, 503, 504];

/// Trait for errors that can be classified as retryable or not
pub trait IsRetryable {
    /// Returns true if the error is transient and the operation should be retried
    fn is_retryable(&self) -> bool;

    /// Server-requested delay before the next attempt, if any
    fn retry_after(&self) -> Option<Duration> {
        None
    }
}

impl IsRetryable for Error {
    fn is_retryable(&self) -> bool {
        match self {
            Error::Http { status, .. } => is_retryable_status(*status),
            // Anything that failed before a status line arrived
            Error::Network(e) => e.is_timeout() || e.is_connect() || e.is_request() || e.is_body(),
            Error::Config { .. }
            | Error::Io(_)
            | Error::Serialization(_)
            | Error::InvalidResponse(_)
            | Error::InvalidUrl(_) => false,
        }
    }

    fn retry_after(&self) -> Option<Duration> {
        match self {
            Error::Http { retry_after, .. } => *retry_after,
            _ => None,
        }
    }
}

/// Whether a response status falls in the transient set
pub fn is_retryable_status(status: u16) -> bool {
    RETRYABLE_STATUSES.contains(&status)
}

/// Parse a `Retry-After` header value given in whole seconds
///
/// HTTP-date values and anything else that is not a non-negative integer yield `None`,
/// in which case the caller falls back to the computed backoff.
pub fn parse_retry_after(value: &str) -> Option<Duration> {
    value.trim().parse::<u64>().ok().map(Duration::from_secs)
}

/// Computed backoff before retry number `retry` (1-based)
///
/// `base * multiplier^(retry - 1)`, never more than `max_delay`.
pub fn backoff_delay(config: &RetryConfig, retry: u32) -> Duration {
    let exponent = i32::try_from(retry.saturating_sub(1)).unwrap_or(i32::MAX);
    let secs = config.base_delay.as_secs_f64() * config.backoff_multiplier.powi(exponent);

    let delay = if secs.is_finite() && secs < config.max_delay.as_secs_f64() {
        Duration::from_secs_f64(secs.max(0.0))
    } else {
        config.max_delay
    };

    let delay = if config.jitter {
        add_jitter(delay)
    } else {
        delay
    };
    delay.min(config.max_delay)
}

/// Delay before retry number `retry`, honoring a server hint for this retry only
pub fn retry_delay(config: &RetryConfig, retry: u32, hint: Option<Duration>) -> Duration {
    match hint {
        Some(hint) => hint.min(config.max_delay),
        None => backoff_delay(config, retry),
    }
}

/// Something that can wait for a duration
#[async_trait]
pub trait Sleeper: Send + Sync {
    /// Wait for `duration`
    async fn sleep(&self, duration: Duration);
}

/// Real-time sleeper backed by the tokio timer
#[derive(Clone, Copy, Debug, Default)]
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Execute an async operation, retrying transient failures
///
/// The operation runs at most `config.max_retries` times in total (at least once).
/// Non-retryable errors are returned immediately; once the budget is spent the last
/// error is returned unchanged.
pub async fn with_retry<F, Fut, T, E>(
    config: &RetryConfig,
    sleeper: &dyn Sleeper,
    mut operation: F,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: IsRetryable + std::fmt::Display,
{
    let max_attempts = config.max_retries.max(1);
    let mut attempt = 1;

    loop {
        match operation().await {
            Ok(result) => {
                if attempt > 1 {
                    tracing::info!(attempts = attempt, "Operation succeeded after retry");
                }
                return Ok(result);
            }
            Err(e) if e.is_retryable() && attempt < max_attempts => {
                let delay = retry_delay(config, attempt, e.retry_after());

                tracing::warn!(
                    error = %e,
                    attempt = attempt,
                    max_attempts = max_attempts,
                    delay_ms = delay.as_millis(),
                    "Operation failed, retrying"
                );

                sleeper.sleep(delay).await;
                attempt += 1;
            }
            Err(e) => {
                if e.is_retryable() {
                    tracing::error!(
                        error = %e,
                        attempts = attempt,
                        "Operation failed after all retry attempts exhausted"
                    );
                } else {
                    tracing::error!(error = %e, "Operation failed with non-retryable error");
                }
                return Err(e);
            }
        }
    }
}

/// Add random jitter to a delay to prevent thundering herd
///
/// The result lies between `delay` and `2 * delay`; callers cap it afterwards.
fn add_jitter(delay: Duration) -> Duration {
    let mut rng = rand::thread_rng();
    let jitter_factor: f64 = rng.gen_range(0.0..=1.0);
    Duration::from_secs_f64(delay.as_secs_f64() * (1.0 + jitter_factor))
}
