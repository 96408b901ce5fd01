//! Bounded exponential-backoff retry for transient persistence failures.
//!
//! Only errors the caller's predicate marks as retryable are retried;
//! anything else returns immediately. Sleeps are tokio sleeps, so dropping
//! the future (cancellation) aborts the loop mid-wait.

use std::future::Future;
use std::time::Duration;

use rand::Rng;
use tokio::time::Instant;

use super::types::StoreError;

/// Backoff shape for conflict retries.
///
/// Defaults: 10 attempts, 50 ms initial wait, x1.3 growth, +/-20 % jitter,
/// 5 s cap per wait, 10 s total elapsed budget.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub initial_interval: Duration,
    pub multiplier: f64,
    pub randomization: f64,
    pub max_interval: Duration,
    pub max_elapsed: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 10,
            initial_interval: Duration::from_millis(50),
            multiplier: 1.3,
            randomization: 0.2,
            max_interval: Duration::from_secs(5),
            max_elapsed: Duration::from_secs(10),
        }
    }
}

/// Retries `op` on serialization conflicts under `policy`.
pub async fn on_serialization_conflict<T, F, Fut>(policy: &RetryPolicy, op: F) -> Result<T, StoreError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, StoreError>>,
{
    retry(policy, StoreError::is_serialization_conflict, op).await
}

/// Runs `op`, retrying while `is_retryable` approves the error and neither
/// the attempt count nor the elapsed budget is exhausted. The last error
/// is returned once the budget runs out.
pub async fn retry<T, E, F, Fut, P>(policy: &RetryPolicy, is_retryable: P, mut op: F) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    P: Fn(&E) -> bool,
{
    let started = Instant::now();
    let mut interval = policy.initial_interval;

    for attempt in 1u32.. {
        match op().await {
            Ok(value) => return Ok(value),
            Err(err) => {
                if !is_retryable(&err)
                    || attempt >= policy.max_attempts
                    || started.elapsed() >= policy.max_elapsed
                {
                    return Err(err);
                }

                let wait = jittered(interval, policy.randomization);
                tracing::debug!(
                    attempt = attempt,
                    wait_ms = wait.as_millis() as u64,
                    "retryable failure, backing off"
                );
                tokio::time::sleep(wait).await;
                interval = next_interval(interval, policy);
            }
        }
    }

    unreachable!("retry loop always returns from within")
}

fn next_interval(current: Duration, policy: &RetryPolicy) -> Duration {
    current.mul_f64(policy.multiplier).min(policy.max_interval)
}

fn jittered(interval: Duration, randomization: f64) -> Duration {
    if randomization <= 0.0 {
        return interval;
    }
    let factor = rand::rng().random_range(1.0 - randomization..=1.0 + randomization);
    interval.mul_f64(factor)
}
