//! Fetch error type shared by the executor, the retry loop and the pool.

use thiserror::Error;

/// Error returned by a single fetch attempt (or by a whole job).
///
/// One tagged enum instead of a type hierarchy: classification only needs the
/// variant and, for HTTP failures, the status code.
#[derive(Debug, Error)]
pub enum FetchError {
    /// The request could not be built or configured (bad option, bad URL for curl).
    #[error("request error: {0}")]
    Request(#[source] curl::Error),
    /// Connect or whole-request timeout. Always retried.
    #[error("timeout: {0}")]
    Timeout(#[source] curl::Error),
    /// Network-level failure before any status line (DNS, refused connection, TLS).
    #[error("{0}")]
    Transport(#[source] curl::Error),
    /// Final response status was >= 400.
    #[error("HTTP {code}: {message}")]
    Http { code: u32, message: String },
    /// Transfer failed while draining the body of a response with status `code`.
    #[error("reading body of HTTP {code} response: {source}")]
    ReadBody {
        code: u32,
        #[source]
        source: curl::Error,
    },
    /// The batch was cancelled before this job finished.
    #[error("cancelled")]
    Cancelled,
    /// The input could not be parsed as an absolute URL; no request was made.
    #[error("malformed url {url}: {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },
    /// The URL names a protocol other than http or https; no request was made.
    #[error("unsupported protocol scheme {scheme:?} in {url}")]
    UnsupportedScheme { url: String, scheme: String },
    /// The blocking transfer task panicked or was torn down.
    #[error("transfer task failed: {0}")]
    Task(String),
}

impl FetchError {
    /// Status code carried by `Http` and `ReadBody`.
    pub fn status_code(&self) -> Option<u32> {
        match self {
            FetchError::Http { code, .. } | FetchError::ReadBody { code, .. } => Some(*code),
            _ => None,
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, FetchError::Timeout(_))
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, FetchError::Cancelled)
    }

    /// Shorthand for [`super::is_retryable`] on a known error.
    pub fn is_retryable(&self) -> bool {
        super::classify::is_retryable(Some(self))
    }
}
