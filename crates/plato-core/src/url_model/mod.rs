//! URL normalization for fetch input.
//!
//! Raw command-line strings may omit the scheme; they get `https://` and are
//! validated before any job is built, so malformed input never reaches the
//! network.

use url::{ParseError, Url};

use crate::retry::FetchError;

/// Scheme assumed when the input has none.
const DEFAULT_SCHEME: &str = "https";

/// Protocols the executor speaks.
const SUPPORTED_SCHEMES: [&str; 2] = ["http", "https"];

/// Normalizes one raw URL string.
///
/// Returns the string as written (not re-serialized, so no trailing slash is
/// added) with a default scheme prepended when missing.
///
/// # Examples
///
/// - `normalize_url("example.com")` → `Ok("https://example.com")`
/// - `normalize_url("http://x.test/a?b=1")` → `Ok("http://x.test/a?b=1")`
/// - `normalize_url("http://%zz")` → `Err(FetchError::InvalidUrl { .. })`
/// - `normalize_url("ftp://x.test/f")` → `Err(FetchError::UnsupportedScheme { .. })`
pub fn normalize_url(raw: &str) -> Result<String, FetchError> {
    let trimmed = raw.trim();
    let invalid = |source| FetchError::InvalidUrl {
        url: raw.to_string(),
        source,
    };
    if trimmed.is_empty() {
        return Err(invalid(ParseError::EmptyHost));
    }

    let candidate = if scheme_prefix(trimmed).is_some() {
        trimmed.to_string()
    } else {
        format!("{}://{}", DEFAULT_SCHEME, trimmed)
    };

    let parsed = Url::parse(&candidate).map_err(invalid)?;
    check_scheme(raw, &parsed)?;
    if parsed.host().is_none() {
        return Err(invalid(ParseError::EmptyHost));
    }
    Ok(candidate)
}

/// Scheme of `s` if it starts with `scheme://`.
///
/// A `://` that appears later (in a path or a query) does not count: the
/// scheme must be a letter followed by letters, digits, `+`, `-` or `.`.
fn scheme_prefix(s: &str) -> Option<&str> {
    let (scheme, _) = s.split_once("://")?;
    let mut chars = scheme.chars();
    let first = chars.next()?;
    let valid = first.is_ascii_alphabetic()
        && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'));
    valid.then_some(scheme)
}

/// Fails with `UnsupportedScheme` unless `url` is http or https.
pub(crate) fn check_scheme(raw: &str, url: &Url) -> Result<(), FetchError> {
    if SUPPORTED_SCHEMES.contains(&url.scheme()) {
        Ok(())
    } else {
        Err(FetchError::UnsupportedScheme {
            url: raw.to_string(),
            scheme: url.scheme().to_string(),
        })
    }
}

/// Normalizes every input, collecting all failures instead of stopping at the first.
pub fn normalize_urls<S: AsRef<str>>(raws: &[S]) -> (Vec<String>, Vec<FetchError>) {
    let mut parsed = Vec::with_capacity(raws.len());
    let mut errors = Vec::new();
    for raw in raws {
        match normalize_url(raw.as_ref()) {
            Ok(u) => parsed.push(u),
            Err(e) => errors.push(e),
        }
    }
    (parsed, errors)
}

/// Replaces the query string of `url` with `query` (raw, already encoded).
pub(crate) fn with_query(url: &str, query: &str) -> Result<String, ParseError> {
    let mut parsed = Url::parse(url)?;
    parsed.set_query(Some(query));
    Ok(parsed.into())
}
