//! Terminal outcome of one job.

use serde::ser::SerializeStruct;
use serde::{Serialize, Serializer};
use std::fmt;

use crate::retry::FetchError;

/// Outcome of one job: body size in bytes, or the error that ended it.
#[derive(Debug)]
pub struct FetchResult {
    pub url: String,
    pub outcome: Result<u64, FetchError>,
}

impl FetchResult {
    pub fn ok(url: impl Into<String>, size: u64) -> Self {
        Self {
            url: url.into(),
            outcome: Ok(size),
        }
    }

    pub fn failed(url: impl Into<String>, err: FetchError) -> Self {
        Self {
            url: url.into(),
            outcome: Err(err),
        }
    }

    pub fn cancelled(url: impl Into<String>) -> Self {
        Self::failed(url, FetchError::Cancelled)
    }

    /// Bytes read; 0 when the job failed.
    pub fn size(&self) -> u64 {
        *self.outcome.as_ref().unwrap_or(&0)
    }

    pub fn error(&self) -> Option<&FetchError> {
        self.outcome.as_ref().err()
    }

    pub fn is_ok(&self) -> bool {
        self.outcome.is_ok()
    }
}

impl fmt::Display for FetchResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.outcome {
            Ok(size) => write!(f, "URL: {}. Size: {}", self.url, size),
            Err(e) => write!(f, "URL: {}. Error: {}", self.url, e),
        }
    }
}

/// `{"url": ..., "size": ..., "error": null | "..."}` for machine-readable output.
impl Serialize for FetchResult {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut s = serializer.serialize_struct("FetchResult", 3)?;
        s.serialize_field("url", &self.url)?;
        s.serialize_field("size", &self.size())?;
        s.serialize_field("error", &self.error().map(|e| e.to_string()))?;
        s.end()
    }
}
