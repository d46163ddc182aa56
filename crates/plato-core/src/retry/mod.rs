//! Retry and backoff policy.
//!
//! This module owns the fetch error taxonomy, the retryable/terminal
//! classification and the exponential backoff loop, so the executor and the
//! worker pool share one consistent policy.

mod classify;
mod error;
mod policy;
mod run;

pub use classify::is_retryable;
pub use error::FetchError;
pub use policy::{RetryDecision, RetryPolicy};
pub use run::with_retry;
