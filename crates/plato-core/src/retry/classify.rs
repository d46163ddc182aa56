//! Classify fetch errors as retryable or terminal.

use super::error::FetchError;

/// Returns true when `err` is transient and another attempt may succeed.
///
/// Timeouts are always retried. HTTP failures (including body-read failures,
/// which carry the response status) are retried only for 5xx; 3xx/4xx are
/// treated as caller mistakes. Everything else is terminal.
pub fn is_retryable(err: Option<&FetchError>) -> bool {
    let Some(err) = err else {
        return false;
    };
    match err {
        FetchError::Timeout(_) => true,
        FetchError::Http { code, .. } | FetchError::ReadBody { code, .. } => {
            classify_http_status(*code)
        }
        FetchError::Request(_)
        | FetchError::Transport(_)
        | FetchError::Cancelled
        | FetchError::InvalidUrl { .. }
        | FetchError::UnsupportedScheme { .. }
        | FetchError::Task(_) => false,
    }
}

/// Retry decision for an HTTP status code alone.
pub(crate) fn classify_http_status(code: u32) -> bool {
    match code {
        300..=499 => false,
        500.. => true,
        _ => false,
    }
}
