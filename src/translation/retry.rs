/*!
 * Bounded retry with exponential backoff for translation calls.
 */

use log::warn;
use rand::Rng;
use std::future::Future;
use std::time::Duration;

use crate::errors::ProviderError;

/// Configuration for retry behavior
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Retries after the first attempt
    pub max_retries: u32,
    /// Delay before the first retry, doubled on each further retry
    pub base_backoff_ms: u64,
    /// Upper bound for a single delay
    pub max_backoff_ms: u64,
    /// Add up to 25% random jitter to each delay
    pub jitter: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_backoff_ms: 1000,
            max_backoff_ms: 30_000,
            jitter: true,
        }
    }
}

impl RetryPolicy {
    /// A policy that never retries
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            ..Self::default()
        }
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn with_base_backoff_ms(mut self, base_backoff_ms: u64) -> Self {
        self.base_backoff_ms = base_backoff_ms;
        self
    }

    pub fn with_jitter(mut self, jitter: bool) -> Self {
        self.jitter = jitter;
        self
    }

    /// Delay before retry number `retry` (1-based)
    pub fn backoff_duration(&self, retry: u32) -> Duration {
        let exponent = retry.saturating_sub(1).min(20);
        let capped_ms = self
            .base_backoff_ms
            .saturating_mul(1u64 << exponent)
            .min(self.max_backoff_ms);

        let final_ms = if self.jitter && capped_ms > 0 {
            let jitter = rand::rng().random_range(0..=capped_ms / 4);
            capped_ms.saturating_add(jitter)
        } else {
            capped_ms
        };

        Duration::from_millis(final_ms)
    }

    /// Run `operation` until it succeeds, fails permanently, or retries run out
    pub async fn run<F, Fut, T>(&self, operation_name: &str, mut operation: F) -> Result<T, ProviderError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, ProviderError>>,
    {
        let mut retry = 0;

        loop {
            match operation().await {
                Ok(value) => return Ok(value),
                Err(e) if !e.is_retryable() || retry >= self.max_retries => return Err(e),
                Err(e) => {
                    retry += 1;
                    let backoff = self.backoff_duration(retry);
                    warn!(
                        "{} failed: {} - retry {}/{} in {} ms",
                        operation_name,
                        e,
                        retry,
                        self.max_retries,
                        backoff.as_millis()
                    );
                    tokio::time::sleep(backoff).await;
                }
            }
        }
    }
}
