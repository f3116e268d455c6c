//! Retry with exponential backoff
//!
//! A transparent wrapper around one unit of work (a single HTTP call). The
//! policy is an explicit value constructed at the call site, not hidden
//! decorator state.

use std::future::Future;
use std::time::Duration;

use hdp_common::HdpError;
use tracing::{error, warn};

/// Failure classification consulted by [`with_retry`].
///
/// Only transient failures (transport errors, server-side status codes)
/// should report `true`; everything else fails fast.
pub trait Retryable {
    fn is_retryable(&self) -> bool;
}

impl Retryable for HdpError {
    fn is_retryable(&self) -> bool {
        HdpError::is_retryable(self)
    }
}

/// Backoff parameters for one call site.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    /// Additional attempts after the first (total attempts = max_retries + 1)
    pub max_retries: u32,
    /// Delay before the first retry
    pub base_delay: Duration,
    /// Ceiling on any single backoff sleep
    pub max_delay: Duration,
    /// Backoff multiplier per attempt
    pub multiplier: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
            multiplier: 2.0,
        }
    }
}

impl RetryPolicy {
    /// Backoff before retry number `attempt` (0-based):
    /// `min(base_delay * multiplier^attempt, max_delay)`.
    fn backoff(&self, attempt: u32) -> Duration {
        let delay = self.base_delay.as_secs_f64() * self.multiplier.powi(attempt as i32);
        self.max_delay.min(Duration::from_secs_f64(delay))
    }
}

/// Execute `op` under `policy`.
///
/// Retryable failures sleep the backoff and try again, up to `max_retries`
/// extra attempts; the last error is returned on exhaustion. A non-retryable
/// failure returns immediately without sleeping. The result passes through
/// untransformed.
pub async fn with_retry<T, E, F, Fut>(policy: &RetryPolicy, mut op: F) -> Result<T, E>
where
    E: Retryable + std::fmt::Display,
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let mut attempt = 0u32;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(e) if !e.is_retryable() => return Err(e),
            Err(e) => {
                if attempt >= policy.max_retries {
                    error!(
                        attempts = policy.max_retries + 1,
                        error = %e,
                        "Retries exhausted"
                    );
                    return Err(e);
                }
                let delay = policy.backoff(attempt);
                warn!(
                    attempt = attempt + 1,
                    max_retries = policy.max_retries,
                    delay_ms = delay.as_millis() as u64,
                    error = %e,
                    "Attempt failed, retrying"
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            },
        }
    }
}
