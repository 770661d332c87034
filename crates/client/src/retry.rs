use crate::api::{ApiError, ApiResult};
use std::thread;
use std::time::Duration;

/// Budget and schedule for retrying transient failures: a bounded number of
/// attempts with exponential backoff, doubling from `initial_backoff` up to
/// `max_backoff`.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        RetryPolicy {
            max_attempts: 4,
            initial_backoff: Duration::from_secs(1),
            max_backoff: Duration::from_secs(16),
        }
    }
}

impl RetryPolicy {
    /// A policy that never sleeps and never retries. Useful in tests.
    #[must_use]
    pub fn none() -> Self {
        RetryPolicy {
            max_attempts: 1,
            initial_backoff: Duration::ZERO,
            max_backoff: Duration::ZERO,
        }
    }
}

/// Run `op`, sleeping and retrying on transient failures until it succeeds
/// or the attempt budget runs out. Permanent failures are returned on first
/// sight; an exhausted budget returns the last transient cause unmasked.
pub fn with_retry<T, F>(policy: &RetryPolicy, label: &str, mut op: F) -> ApiResult<T>
where
    F: FnMut() -> ApiResult<T>,
{
    let mut backoff = policy.initial_backoff;
    let mut attempt = 1u32;

    loop {
        match op() {
            Ok(value) => return Ok(value),
            Err(err) if err.is_transient() && attempt < policy.max_attempts => {
                tracing::warn!(
                    operation = label,
                    attempt,
                    backoff_ms = backoff.as_millis() as u64,
                    error = %err,
                    "transient failure, backing off"
                );
                thread::sleep(backoff);
                backoff = (backoff * 2).min(policy.max_backoff);
                attempt += 1;
            }
            Err(err) => return Err(err),
        }
    }
}
