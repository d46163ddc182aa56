//! `fetcher URL...` – fetch a batch and print one line per result.

use anyhow::Result;
use plato_core::config::FetcherConfig;
use plato_core::url_model;
use plato_core::{FetchResult, Fetcher};
use tokio_util::sync::CancellationToken;

use crate::cli::signal;

/// Result counts for the end-of-run log line.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Summary {
    pub ok: usize,
    pub failed: usize,
    pub cancelled: usize,
}

impl Summary {
    fn record(&mut self, res: &FetchResult) {
        match res.error() {
            None => self.ok += 1,
            Some(e) if e.is_cancelled() => self.cancelled += 1,
            Some(_) => self.failed += 1,
        }
    }
}

/// Renders a result as printed on stdout.
pub fn format_result(res: &FetchResult, json: bool) -> Result<String> {
    if json {
        Ok(serde_json::to_string(res)?)
    } else {
        Ok(res.to_string())
    }
}

pub async fn run_fetch(cfg: &FetcherConfig, urls: &[String], json: bool) -> Result<Summary> {
    let (_, malformed) = url_model::normalize_urls(urls);
    for err in &malformed {
        tracing::warn!("{}", err);
    }

    let fetcher = Fetcher::new(cfg.clone())?;
    let cancel = CancellationToken::new();
    let listener = signal::spawn_shutdown_listener(cancel.clone());

    let mut rx = fetcher.process(&cancel, urls);
    let mut summary = Summary::default();
    while let Some(res) = rx.recv().await {
        summary.record(&res);
        println!("{}", format_result(&res, json)?);
    }
    listener.abort();

    Ok(summary)
}
