//! Randomized exponential backoff for Drive API requests.
//!
//! Many copytools run concurrently against the same Drive account, so rate
//! limit and backend errors are expected. Each request is retried with a
//! sleep of `base * 2^n` plus up to `jitter` of random noise until the sleep
//! would exceed `max_sleep`.

use crate::utils::error::{CopytoolError, Result};
use rand::Rng;
use std::future::Future;
use std::time::Duration;

pub const DEFAULT_MAX_SLEEP_SECS: u64 = 2100;

#[derive(Debug, Clone, PartialEq)]
pub struct BackoffPolicy {
    pub base: Duration,
    pub jitter: Duration,
    pub max_sleep: Duration,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self {
            base: Duration::from_secs(1),
            jitter: Duration::from_secs(1),
            max_sleep: Duration::from_secs(DEFAULT_MAX_SLEEP_SECS),
        }
    }
}

impl BackoffPolicy {
    /// Sleep before retry number `attempt` (1-based). `jitter_fraction` is in `[0, 1]`.
    pub fn delay_for(&self, attempt: u32, jitter_fraction: f64) -> Duration {
        let factor = 1u32.checked_shl(attempt).unwrap_or(u32::MAX);
        self.base
            .saturating_mul(factor)
            .saturating_add(self.jitter.mul_f64(jitter_fraction.clamp(0.0, 1.0)))
    }

    fn random_fraction() -> f64 {
        f64::from(rand::thread_rng().gen_range(0..=1000u32)) / 1000.0
    }

    /// Runs `op` until it succeeds, fails with a non-retryable error, or the
    /// next sleep would exceed `max_sleep`.
    pub async fn retry<T, F, Fut>(&self, operation: &str, mut op: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut attempt: u32 = 0;
        loop {
            let err = match op().await {
                Ok(value) => return Ok(value),
                Err(err) => err,
            };

            tracing::error!("{}: {}", operation, err);

            if !err.is_retryable() {
                if let CopytoolError::ApiError { status, message } = &err {
                    tracing::error!("{}: Http fatal error {} ({})", operation, status, message);
                }
                return Err(err);
            }

            attempt += 1;
            let sleep = self.delay_for(attempt, Self::random_fraction());
            if sleep > self.max_sleep {
                tracing::error!("{}: aborting exponential backoff", operation);
                return Err(CopytoolError::BackoffExhausted {
                    operation: operation.to_string(),
                    attempts: attempt,
                    source: Box::new(err),
                });
            }

            tracing::warn!("{}: sleeping {:.3} secs", operation, sleep.as_secs_f64());
            tokio::time::sleep(sleep).await;
            tracing::info!("{}: now retrying", operation);
        }
    }
}
