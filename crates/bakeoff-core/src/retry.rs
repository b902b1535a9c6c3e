//! Bounded retry with exponential backoff and full jitter for provider calls.

use crate::providers::ProviderError;
use rand::Rng;
use std::future::Future;
use std::time::Duration;
use tracing::warn;

#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_backoff: Duration,
    pub max_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_backoff: Duration::from_millis(500),
            max_backoff: Duration::from_secs(30),
        }
    }
}

/// Run `op` until it succeeds, fails with a non-retryable error, or the
/// attempt budget is exhausted. The last error is returned unchanged; the
/// caller decides whether to record it as data.
pub async fn with_retries<T, F, Fut>(policy: &RetryPolicy, mut op: F) -> Result<T, ProviderError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, ProviderError>>,
{
    let mut attempt: u32 = 0;
    loop {
        match op().await {
            Ok(v) => return Ok(v),
            Err(e) if e.is_retryable() && attempt + 1 < policy.max_attempts.max(1) => {
                attempt += 1;
                let backoff = backoff_for(policy, attempt, &e);
                warn!(
                    attempt,
                    backoff_ms = backoff.as_millis() as u64,
                    error = %e,
                    "retrying provider call"
                );
                tokio::time::sleep(backoff).await;
            }
            Err(e) => return Err(e),
        }
    }
}

fn backoff_for(policy: &RetryPolicy, attempt: u32, err: &ProviderError) -> Duration {
    match err {
        ProviderError::RateLimited {
            retry_after: Some(retry_after),
        } => {
            // Honour the server hint, capped and lightly jittered.
            let capped = (*retry_after).min(policy.max_backoff);
            let base_ms = capped.as_millis() as u64;
            let factor: f64 = rand::thread_rng().gen_range(0.8..=1.2);
            let jittered_ms = ((base_ms as f64) * factor).round() as u64;
            Duration::from_millis(jittered_ms.max(100))
        }
        _ => {
            let shift = attempt.min(16);
            let base = policy
                .base_backoff
                .checked_mul(1u32 << shift)
                .unwrap_or(policy.max_backoff)
                .min(policy.max_backoff);
            let jittered_ms = rand::thread_rng().gen_range(0..=base.as_millis() as u64);
            Duration::from_millis(jittered_ms.max(10))
        }
    }
}
