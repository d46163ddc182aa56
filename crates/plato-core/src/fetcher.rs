//! Batch fetch entry point.

use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::config::{ConfigError, FetcherConfig};
use crate::request::{DiagnosticSink, Executor};
use crate::retry::RetryPolicy;
use crate::scheduler::{FetchContext, FetchJob, FetchResult, Job, Pool};
use crate::url_model;

/// Fetches batches of URLs with the configured retry policy and worker ceiling.
///
/// Holds only immutable configuration, so one `Fetcher` can serve many batches.
#[derive(Debug, Clone)]
pub struct Fetcher {
    ctx: Arc<FetchContext>,
    max_pool_size: usize,
}

impl Fetcher {
    /// Validates `cfg`; an invalid config means no batch can start.
    pub fn new(cfg: FetcherConfig) -> Result<Self, ConfigError> {
        cfg.validate()?;
        let executor = Executor::new(&cfg);
        Ok(Self::build(&cfg, executor))
    }

    /// Like [`Fetcher::new`] with a custom destination for debug wire dumps.
    pub fn with_sink(
        cfg: FetcherConfig,
        sink: Arc<dyn DiagnosticSink>,
    ) -> Result<Self, ConfigError> {
        cfg.validate()?;
        let executor = Executor::new(&cfg).with_sink(sink);
        Ok(Self::build(&cfg, executor))
    }

    fn build(cfg: &FetcherConfig, executor: Executor) -> Self {
        Self {
            ctx: Arc::new(FetchContext {
                executor,
                policy: RetryPolicy::from_config(&cfg.retry),
            }),
            max_pool_size: cfg.max_pool_size,
        }
    }

    /// One job per input, in input order. Malformed inputs become jobs that
    /// fail with `InvalidUrl` without touching the network.
    pub fn jobs<S: AsRef<str>>(&self, urls: &[S]) -> Vec<FetchJob> {
        urls.iter().map(|raw| self.job(raw.as_ref())).collect()
    }

    fn job(&self, raw: &str) -> FetchJob {
        match url_model::normalize_url(raw) {
            Ok(url) => FetchJob::new(url, Arc::clone(&self.ctx)),
            Err(e) => FetchJob::rejected(raw.to_string(), e, Arc::clone(&self.ctx)),
        }
    }

    /// Fetches every URL and streams one result per URL in completion order.
    ///
    /// Cancelling `cancel` turns every unfinished job into a `Cancelled`
    /// result; the stream still closes only after all workers exit.
    pub fn process<S: AsRef<str>>(
        &self,
        cancel: &CancellationToken,
        urls: &[S],
    ) -> mpsc::Receiver<FetchResult> {
        let pool = Pool::new(self.jobs(urls), self.max_pool_size);
        tracing::info!(
            urls = pool.len(),
            workers = pool.size(),
            "starting fetch batch"
        );
        pool.start(cancel.clone())
    }

    /// Fetches a single URL on the current task (no pool).
    pub async fn request(&self, cancel: &CancellationToken, url: &str) -> FetchResult {
        self.job(url).run(cancel.clone()).await
    }
}
