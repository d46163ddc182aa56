//! CLI for the plato URL fetcher.

mod commands;
mod signal;

use anyhow::Result;
use clap::{Args, CommandFactory, Parser};
use plato_core::config::{self, FetcherConfig};
use plato_core::logging;
use std::path::PathBuf;

use commands::{print_completions, run_fetch};

/// Top-level CLI: fetch every URL concurrently and print one line per result.
#[derive(Debug, Parser)]
#[command(name = "fetcher", version)]
#[command(about = "Urls fetcher", long_about = None)]
pub struct Cli {
    /// URLs to fetch. A missing scheme defaults to https.
    #[arg(value_name = "URL", required_unless_present = "completions")]
    pub urls: Vec<String>,

    #[command(flatten)]
    pub overrides: Overrides,

    /// Print each result as a JSON object on its own line.
    #[arg(long)]
    pub json: bool,

    /// Append logs to ~/.local/state/plato/fetcher.log instead of stderr.
    #[arg(long)]
    pub log_file: bool,

    /// Read configuration from PATH instead of ~/.config/plato/config.toml.
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Print a shell completion script and exit.
    #[arg(long, value_name = "SHELL")]
    pub completions: Option<clap_complete::Shell>,
}

/// Per-run overrides of the config file values.
#[derive(Debug, Default, Args)]
pub struct Overrides {
    /// Maximum attempts per URL (including the first).
    #[arg(long, value_name = "N")]
    pub attempts: Option<u32>,
    /// Relative backoff jitter, e.g. 0.1 for +/-10%.
    #[arg(long, value_name = "FRACTION")]
    pub jitter: Option<f64>,
    /// Backoff base in milliseconds.
    #[arg(long, value_name = "MS")]
    pub factor_ms: Option<u64>,
    /// Ceiling on a single backoff wait, in seconds.
    #[arg(long, value_name = "SECS")]
    pub max_timeout_secs: Option<f64>,
    #[arg(long, value_name = "SECS")]
    pub connect_timeout_secs: Option<f64>,
    #[arg(long, value_name = "SECS")]
    pub request_timeout_secs: Option<f64>,
    /// Maximum number of concurrent workers.
    #[arg(long, value_name = "N")]
    pub workers: Option<usize>,
    /// Dump every request and response to the log.
    #[arg(long)]
    pub debug: bool,
    /// Skip TLS certificate verification.
    #[arg(long)]
    pub insecure: bool,
}

impl Overrides {
    pub fn apply(&self, cfg: &mut FetcherConfig) {
        if let Some(v) = self.attempts {
            cfg.retry.attempts = v;
        }
        if let Some(v) = self.jitter {
            cfg.retry.jitter = v;
        }
        if let Some(v) = self.factor_ms {
            cfg.retry.factor_ms = v;
        }
        if let Some(v) = self.max_timeout_secs {
            cfg.retry.max_timeout_secs = v;
        }
        if let Some(v) = self.connect_timeout_secs {
            cfg.timeouts.connect_timeout_secs = v;
        }
        if let Some(v) = self.request_timeout_secs {
            cfg.timeouts.request_timeout_secs = v;
        }
        if let Some(v) = self.workers {
            cfg.max_pool_size = v;
        }
        cfg.debug |= self.debug;
        cfg.insecure_tls |= self.insecure;
    }
}

impl Cli {
    pub async fn run_from_args() -> Result<()> {
        let cli = Cli::parse();

        if let Some(shell) = cli.completions {
            print_completions(shell, &mut Cli::command());
            return Ok(());
        }

        let filter = if cli.overrides.debug {
            "debug"
        } else {
            logging::DEFAULT_FILTER
        };
        if cli.log_file {
            if let Err(e) = logging::init_logging(filter) {
                logging::init_logging_stderr(filter);
                tracing::warn!("file logging unavailable ({:#}), using stderr", e);
            }
        } else {
            logging::init_logging_stderr(filter);
        }

        let mut cfg = match &cli.config {
            Some(path) => config::load_from_path(path)?,
            None => config::load_or_init().unwrap_or_else(|e| {
                tracing::warn!("could not load config ({:#}), using defaults", e);
                FetcherConfig::default()
            }),
        };
        cli.overrides.apply(&mut cfg);
        tracing::debug!("effective config: {:?}", cfg);

        let summary = run_fetch(&cfg, &cli.urls, cli.json).await?;
        tracing::info!(
            ok = summary.ok,
            failed = summary.failed,
            cancelled = summary.cancelled,
            "fetch finished"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests;
