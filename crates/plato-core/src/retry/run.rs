//! Retry loop: run an async attempt until success or the policy says stop.

use rand::rngs::StdRng;
use rand::SeedableRng;
use std::future::Future;
use std::time::{SystemTime, UNIX_EPOCH};
use tokio_util::sync::CancellationToken;

use super::error::FetchError;
use super::policy::{RetryDecision, RetryPolicy};

/// Runs `action` until it succeeds, fails with a terminal error, or the
/// attempt budget is spent. `action` receives the 0-based attempt index.
///
/// Backoff waits race against `cancel`; a cancelled wait returns
/// [`FetchError::Cancelled`] without another attempt.
pub async fn with_retry<T, F, Fut>(
    cancel: &CancellationToken,
    policy: &RetryPolicy,
    mut action: F,
) -> Result<T, FetchError>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, FetchError>>,
{
    // Fresh RNG per sequence so concurrently failing jobs do not retry in lockstep.
    let mut rng = StdRng::seed_from_u64(clock_seed());
    let mut attempt = 0u32;
    loop {
        let err = match action(attempt).await {
            Ok(value) => return Ok(value),
            Err(e) => e,
        };
        match policy.decide(attempt, &err, &mut rng) {
            RetryDecision::NoRetry => {
                if err.is_retryable() {
                    tracing::warn!(
                        attempts = attempt + 1,
                        "retry budget exhausted, last error: {}",
                        err
                    );
                }
                return Err(err);
            }
            RetryDecision::RetryAfter(delay) => {
                tracing::info!(
                    "got error: {}. retrying, attempt {}/{}",
                    err,
                    attempt + 2,
                    policy.attempts
                );
                tracing::info!("waiting {:?} before next request", delay);
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => return Err(FetchError::Cancelled),
                    _ = tokio::time::sleep(delay) => {}
                }
                attempt += 1;
            }
        }
    }
}

fn clock_seed() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or_default()
}
