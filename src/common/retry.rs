//! Bounded retry with jittered exponential backoff
//!
//! Every external call the coordinator makes (metadata fetch, peer address
//! lookup, distribution download) goes through [`retry_with_backoff`] so a
//! transient failure never aborts a bootstrap that would have succeeded a
//! few seconds later. Only errors marked retryable by
//! [`Error::is_retryable`](crate::Error::is_retryable) are retried.

use rand::prelude::*;
use std::time::Duration;

use crate::common::{Error, Result};

/// Exponential backoff with jitter
#[derive(Debug, Clone)]
pub struct BackoffConfig {
    pub init_backoff: Duration,
    pub max_backoff: Duration,
    pub base: f64,
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            init_backoff: Duration::from_millis(500),
            max_backoff: Duration::from_secs(30),
            base: 2.,
        }
    }
}

/// [`Backoff`] can be created from a [`BackoffConfig`]
///
/// Consecutive calls to [`Backoff::next`] return the next jittered backoff
/// interval, growing geometrically up to the configured maximum.
#[derive(Debug)]
pub struct Backoff<R> {
    init_backoff: f64,
    next_backoff_secs: f64,
    max_backoff_secs: f64,
    base: f64,
    rng: R,
}

impl Backoff<ThreadRng> {
    /// Create a new [`Backoff`] from the provided [`BackoffConfig`]
    pub fn new(config: &BackoffConfig) -> Self {
        Self::new_with_rng(config, thread_rng())
    }
}

impl<R: Rng> Backoff<R> {
    pub fn new_with_rng(config: &BackoffConfig, rng: R) -> Self {
        let init_backoff = config.init_backoff.as_secs_f64();
        Self {
            init_backoff,
            next_backoff_secs: init_backoff,
            max_backoff_secs: config.max_backoff.as_secs_f64(),
            base: config.base,
            rng,
        }
    }

    /// Returns the next backoff duration to wait for
    pub fn next(&mut self) -> Duration {
        let next_backoff = self.max_backoff_secs.min(
            self.rng
                .gen_range(self.init_backoff..(self.next_backoff_secs * self.base)),
        );
        Duration::from_secs_f64(std::mem::replace(&mut self.next_backoff_secs, next_backoff))
    }
}

/// Retry policy: bounded attempts over a jittered exponential backoff.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub backoff: BackoffConfig,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 10,
            backoff: BackoffConfig::default(),
        }
    }
}

/// Run `f` until it succeeds, returns a non-retryable error, or the attempt
/// budget is exhausted. The last error is returned on exhaustion, so callers
/// can distinguish "peer not yet ready" from other terminal failures.
pub async fn retry_with_backoff<F, Fut, T>(policy: &RetryPolicy, what: &str, mut f: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<T>>,
{
    let mut backoff = Backoff::new(&policy.backoff);
    let mut last = None;

    for attempt in 1..=policy.max_attempts.max(1) {
        match f().await {
            Ok(result) => return Ok(result),
            Err(e) if e.is_retryable() && attempt < policy.max_attempts => {
                let delay = backoff.next();
                tracing::warn!(
                    "{} attempt {}/{} failed: {}, retrying in {:?}",
                    what,
                    attempt,
                    policy.max_attempts,
                    e,
                    delay
                );
                tokio::time::sleep(delay).await;
                last = Some(e);
            }
            Err(e) => return Err(e),
        }
    }

    Err(last.unwrap_or_else(|| Error::Other(format!("{}: retry budget exhausted", what))))
}
