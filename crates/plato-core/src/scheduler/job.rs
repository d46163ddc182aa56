//! Jobs scheduled by the pool.

use std::future::Future;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use super::result::FetchResult;
use crate::request::{Executor, Request};
use crate::retry::{with_retry, FetchError, RetryPolicy};

/// A unit of work the pool can run. Consumed by `run`.
pub trait Job: Send + 'static {
    /// URL reported when the job is cancelled before it produced its own result.
    fn url(&self) -> &str;

    fn run(self, cancel: CancellationToken) -> impl Future<Output = FetchResult> + Send;
}

/// Read-only state shared by every job of a batch.
#[derive(Debug)]
pub(crate) struct FetchContext {
    pub executor: Executor,
    pub policy: RetryPolicy,
}

/// GET one URL with retries and report the body size.
#[derive(Debug)]
pub struct FetchJob {
    url: String,
    /// Set when the input URL was rejected; the job then fails without I/O.
    rejected: Option<FetchError>,
    ctx: Arc<FetchContext>,
}

impl FetchJob {
    pub(crate) fn new(url: String, ctx: Arc<FetchContext>) -> Self {
        Self {
            url,
            rejected: None,
            ctx,
        }
    }

    pub(crate) fn rejected(url: String, err: FetchError, ctx: Arc<FetchContext>) -> Self {
        Self {
            url,
            rejected: Some(err),
            ctx,
        }
    }
}

impl Job for FetchJob {
    fn url(&self) -> &str {
        &self.url
    }

    fn run(self, cancel: CancellationToken) -> impl Future<Output = FetchResult> + Send {
        async move {
            if let Some(err) = self.rejected {
                return FetchResult::failed(self.url, err);
            }
            let url = self.url.as_str();
            let executor = &self.ctx.executor;
            let outcome = with_retry(&cancel, &self.ctx.policy, |attempt| {
                let cancel = &cancel;
                async move {
                    tracing::debug!(url, attempt, "GET");
                    executor.execute(cancel, Request::get(url)).await
                }
            })
            .await;
            FetchResult {
                outcome: outcome.map(|body| body.len() as u64),
                url: self.url,
            }
        }
    }
}
