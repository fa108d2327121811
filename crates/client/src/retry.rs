// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Bounded retries with exponential backoff for transient failures.

use std::future::Future;
use std::time::Duration;

use tracing::debug;

use crate::error::ApiError;

/// Retry budget and backoff shape.
///
/// Holds no per-call state: every [`RetryPolicy::run`] owns its own counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first attempt.
    pub max_retries: u32,
    pub base: Duration,
    pub cap: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self { max_retries: 3, base: Duration::from_millis(1000), cap: Duration::from_millis(4000) }
    }
}

impl RetryPolicy {
    /// Wait before the retry following zero-indexed `attempt`: `min(base * 2^attempt, cap)`.
    pub fn backoff(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt);
        self.base.saturating_mul(factor).min(self.cap)
    }

    /// Run `attempt` until it succeeds, fails with a non-retryable error, or
    /// the budget is spent. The last failure is returned unchanged.
    pub async fn run<T, F, Fut>(&self, mut attempt: F) -> Result<T, ApiError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, ApiError>>,
    {
        let mut tries = 0u32;
        loop {
            match attempt().await {
                Ok(value) => return Ok(value),
                Err(e) => {
                    if !e.is_retryable() || tries >= self.max_retries {
                        return Err(e);
                    }
                    let delay = self.backoff(tries);
                    debug!(
                        attempt = tries + 1,
                        max = self.max_retries,
                        code = e.code(),
                        delay_ms = delay.as_millis() as u64,
                        "request failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    tries += 1;
                }
            }
        }
    }
}

#[cfg(test)]
#[path = "retry_tests.rs"]
mod tests;
