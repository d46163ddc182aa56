#![allow(dead_code)]

pub mod script_server;

use plato_core::config::FetcherConfig;

/// Defaults with millisecond backoff so retry tests stay fast.
pub fn fast_config() -> FetcherConfig {
    let mut cfg = FetcherConfig::default();
    cfg.retry.factor_ms = 1;
    cfg.retry.max_timeout_secs = 0.05;
    cfg
}
