use rand::Rng;
use std::time::Duration;

use super::classify::is_retryable;
use super::error::FetchError;
use crate::config::RetryConfig;

/// Decision returned by the retry policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Do not retry this error (terminal, or attempt budget spent).
    NoRetry,
    /// Retry after the given delay.
    RetryAfter(Duration),
}

/// Binary exponential backoff with a ceiling and symmetric jitter.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Maximum number of attempts (including the first).
    pub attempts: u32,
    /// Maximum relative deviation applied to each delay (0.1 = +/-10%).
    pub jitter: f64,
    /// Backoff base: the wait before attempt `n` is `factor * 2^n`.
    pub factor: Duration,
    /// Ceiling on the base wait before jitter is applied.
    pub max_timeout: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&RetryConfig::default())
    }
}

impl RetryPolicy {
    pub fn from_config(cfg: &RetryConfig) -> Self {
        Self {
            attempts: cfg.attempts,
            jitter: cfg.jitter,
            factor: cfg.factor(),
            max_timeout: cfg.max_timeout(),
        }
    }

    /// Base (un-jittered) wait before attempt `attempt` (0-based), capped at `max_timeout`.
    pub fn backoff(&self, attempt: u32) -> Duration {
        2u32.checked_pow(attempt)
            .and_then(|mul| self.factor.checked_mul(mul))
            .map_or(self.max_timeout, |d| d.min(self.max_timeout))
    }

    /// Perturb `delay` uniformly within `[delay * (1 - jitter), delay * (1 + jitter)]`.
    pub fn jittered<R: Rng>(&self, delay: Duration, rng: &mut R) -> Duration {
        let nanos = delay.as_nanos() as f64;
        let low = (nanos * (1.0 - self.jitter)).floor().max(0.0) as u64;
        let high = (nanos * (1.0 + self.jitter)).ceil() as u64;
        if high <= low {
            return delay;
        }
        Duration::from_nanos(rng.random_range(low..high))
    }

    /// Decide what to do after attempt `attempt` (0-based) failed with `err`.
    pub fn decide<R: Rng>(
        &self,
        attempt: u32,
        err: &FetchError,
        rng: &mut R,
    ) -> RetryDecision {
        if !is_retryable(Some(err)) {
            return RetryDecision::NoRetry;
        }
        let next = attempt.saturating_add(1);
        if next >= self.attempts {
            return RetryDecision::NoRetry;
        }
        RetryDecision::RetryAfter(self.jittered(self.backoff(next), rng))
    }
}
