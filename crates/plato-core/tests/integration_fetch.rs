//! Integration tests: fetch against a local scripted HTTP server.
//!
//! Covers retry on 5xx, no retry on 4xx, timeouts, cancellation, batch
//! accounting and the debug wire dumps.

mod common;

use common::script_server::{self, Reply};
use plato_core::config::FetcherConfig;
use plato_core::request::{DiagnosticSink, Executor, Method, Request};
use plato_core::{FetchError, FetchResult, Fetcher};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;

async fn collect(mut rx: tokio::sync::mpsc::Receiver<FetchResult>) -> Vec<FetchResult> {
    let mut out = Vec::new();
    while let Some(r) = rx.recv().await {
        out.push(r);
    }
    out
}

#[derive(Default)]
struct RecordingSink {
    requests: Mutex<Vec<String>>,
    responses: Mutex<Vec<String>>,
}

impl DiagnosticSink for RecordingSink {
    fn request(&self, dump: &str) {
        self.requests.lock().unwrap().push(dump.to_string());
    }

    fn response(&self, dump: &str) {
        self.responses.lock().unwrap().push(dump.to_string());
    }
}

#[tokio::test]
async fn successful_fetch_reports_body_size() {
    let server = script_server::start(vec![Reply::ok(vec![b'x'; 1234])]);
    let fetcher = Fetcher::new(common::fast_config()).unwrap();

    let res = fetcher.request(&CancellationToken::new(), &server.url).await;

    assert_eq!(res.outcome.as_ref().ok(), Some(&1234));
    assert_eq!(res.url, server.url);
    assert_eq!(server.hits(), 1);
    let sent = server.last_request().unwrap();
    assert!(sent.starts_with("GET / HTTP/1.1\r\n"), "{}", sent);
    assert!(sent.contains("User-Agent: plato-fetcher/"), "{}", sent);
}

#[tokio::test]
async fn not_found_makes_exactly_one_attempt() {
    let server = script_server::start(vec![Reply::status(404, "Not Found")]);
    let fetcher = Fetcher::new(common::fast_config()).unwrap();

    let res = fetcher.request(&CancellationToken::new(), &server.url).await;

    match res.error() {
        Some(FetchError::Http { code, message }) => {
            assert_eq!(*code, 404);
            assert!(message.contains("Not Found"), "{}", message);
        }
        other => panic!("expected HTTP 404, got {:?}", other),
    }
    assert_eq!(res.size(), 0);
    assert_eq!(server.hits(), 1);
}

#[tokio::test]
async fn server_errors_are_retried_until_success() {
    let server = script_server::start(vec![
        Reply::status(503, "Service Unavailable"),
        Reply::status(503, "Service Unavailable"),
        Reply::ok("hello world"),
    ]);
    let mut cfg = FetcherConfig::default();
    cfg.retry.attempts = 5;
    cfg.retry.factor_ms = 20;
    let fetcher = Fetcher::new(cfg).unwrap();

    let started = Instant::now();
    let res = fetcher.request(&CancellationToken::new(), &server.url).await;

    assert_eq!(res.outcome.as_ref().ok(), Some(&11));
    assert_eq!(server.hits(), 3);
    // Two waits: ~40ms and ~80ms, each at most 10% shorter.
    assert!(started.elapsed() >= Duration::from_millis(100));
}

#[tokio::test]
async fn exhausted_retries_report_last_error() {
    let server = script_server::start(vec![Reply::status(500, "Internal Server Error")]);
    let mut cfg = common::fast_config();
    cfg.retry.attempts = 3;
    let fetcher = Fetcher::new(cfg).unwrap();

    let res = fetcher.request(&CancellationToken::new(), &server.url).await;

    assert_eq!(res.error().and_then(|e| e.status_code()), Some(500));
    assert_eq!(server.hits(), 3);
}

#[tokio::test]
async fn slow_server_times_out_and_is_retried() {
    let server = script_server::start(vec![Reply::ok("late").delayed(Duration::from_secs(2))]);
    let mut cfg = common::fast_config();
    cfg.retry.attempts = 2;
    cfg.timeouts.request_timeout_secs = 0.2;
    let fetcher = Fetcher::new(cfg).unwrap();

    let res = fetcher.request(&CancellationToken::new(), &server.url).await;

    assert!(res.error().map_or(false, |e| e.is_timeout()), "{}", res);
    assert_eq!(server.hits(), 2);
}

#[tokio::test]
async fn refused_connection_is_not_retried() {
    let url = script_server::closed_port_url();
    let fetcher = Fetcher::new(common::fast_config()).unwrap();

    let res = fetcher.request(&CancellationToken::new(), &url).await;

    match res.error() {
        Some(e @ FetchError::Transport(_)) => assert!(!e.is_retryable()),
        other => panic!("expected transport error, got {:?}", other),
    }
}

#[tokio::test]
async fn batch_yields_one_result_per_url() {
    let ok = script_server::start(vec![Reply::ok("abc")]);
    let missing = script_server::start(vec![Reply::status(404, "Not Found")]);
    let mut urls = Vec::new();
    for i in 0..8 {
        urls.push(format!("{}item/{}", ok.url, i));
    }
    for i in 0..3 {
        urls.push(format!("{}gone/{}", missing.url, i));
    }
    urls.push("http://%zz".to_string());

    let fetcher = Fetcher::new(common::fast_config()).unwrap();
    let results = collect(fetcher.process(&CancellationToken::new(), &urls)).await;

    assert_eq!(results.len(), urls.len());
    assert_eq!(results.iter().filter(|r| r.size() == 3).count(), 8);
    assert_eq!(
        results
            .iter()
            .filter(|r| r.error().and_then(|e| e.status_code()) == Some(404))
            .count(),
        3
    );
    assert!(results
        .iter()
        .any(|r| matches!(r.error(), Some(FetchError::InvalidUrl { .. }))));
    assert_eq!(ok.hits(), 8);
    assert_eq!(missing.hits(), 3);
}

#[tokio::test]
async fn cancel_aborts_in_flight_request() {
    let server = script_server::start(vec![Reply::ok("slow").delayed(Duration::from_secs(5))]);
    let mut cfg = common::fast_config();
    cfg.timeouts.request_timeout_secs = 30.0;
    let fetcher = Fetcher::new(cfg).unwrap();
    let token = CancellationToken::new();
    let rx = fetcher.process(&token, &[server.url.clone()]);

    tokio::time::sleep(Duration::from_millis(200)).await;
    let cancelled_at = Instant::now();
    token.cancel();
    let results = collect(rx).await;

    assert!(cancelled_at.elapsed() < Duration::from_secs(2));
    assert_eq!(results.len(), 1);
    assert!(results[0].error().map_or(false, |e| e.is_cancelled()));
    assert_eq!(results[0].url, server.url);
}

#[tokio::test]
async fn cancel_during_backoff_skips_remaining_wait() {
    let server = script_server::start(vec![Reply::status(503, "Service Unavailable")]);
    let mut cfg = FetcherConfig::default();
    cfg.retry.factor_ms = 5_000;
    cfg.retry.max_timeout_secs = 60.0;
    let fetcher = Fetcher::new(cfg).unwrap();
    let token = CancellationToken::new();
    let rx = fetcher.process(&token, &[server.url.clone(), server.url.clone()]);

    tokio::time::sleep(Duration::from_millis(300)).await;
    let cancelled_at = Instant::now();
    token.cancel();
    let results = collect(rx).await;

    assert!(cancelled_at.elapsed() < Duration::from_secs(1));
    assert_eq!(results.len(), 2);
    assert!(results
        .iter()
        .all(|r| r.error().map_or(false, |e| e.is_cancelled())));
    assert_eq!(server.hits(), 2);
}

#[tokio::test]
async fn debug_mode_dumps_request_and_response() {
    let server = script_server::start(vec![Reply::ok("payload")]);
    let mut cfg = common::fast_config();
    cfg.debug = true;
    let sink = Arc::new(RecordingSink::default());
    let fetcher = Fetcher::with_sink(cfg, sink.clone()).unwrap();

    let res = fetcher.request(&CancellationToken::new(), &server.url).await;
    assert!(res.is_ok());

    let requests = sink.requests.lock().unwrap();
    let responses = sink.responses.lock().unwrap();
    assert_eq!(requests.len(), 1);
    assert!(requests[0].starts_with("GET / HTTP/1.1\r\n"));
    assert!(requests[0].contains("User-Agent: plato-fetcher/"));
    assert_eq!(responses.len(), 1);
    assert!(responses[0].starts_with("HTTP/1.1 200 OK\r\n"));
    assert!(responses[0].ends_with("\r\n\r\npayload"));
}

#[tokio::test]
async fn no_dumps_without_debug() {
    let server = script_server::start(vec![Reply::ok("payload")]);
    let sink = Arc::new(RecordingSink::default());
    let fetcher = Fetcher::with_sink(common::fast_config(), sink.clone()).unwrap();

    let res = fetcher.request(&CancellationToken::new(), &server.url).await;
    assert!(res.is_ok());
    assert!(sink.requests.lock().unwrap().is_empty());
    assert!(sink.responses.lock().unwrap().is_empty());
}

#[tokio::test]
async fn executor_sends_query_and_body() {
    let server = script_server::start(vec![Reply::ok("created")]);
    let executor = Executor::new(&common::fast_config());
    let req = Request::get(format!("{}api?old=1", server.url))
        .with_method(Method::Post)
        .with_query("a=1&b=2")
        .with_body("abc");

    let body = executor
        .execute(&CancellationToken::new(), req)
        .await
        .unwrap();

    assert_eq!(body, b"created");
    let sent = server.last_request().unwrap();
    assert!(sent.starts_with("POST /api?a=1&b=2 HTTP/1.1\r\n"), "{}", sent);
    assert!(sent.contains("Content-Length: 3\r\n"), "{}", sent);
    assert!(sent.ends_with("\r\n\r\nabc"), "{}", sent);
}

#[tokio::test]
async fn executor_returns_cancelled_when_token_already_fired() {
    let server = script_server::start(vec![Reply::ok("x").delayed(Duration::from_secs(3))]);
    let executor = Executor::new(&common::fast_config());
    let token = CancellationToken::new();
    token.cancel();

    let err = executor
        .execute(&token, Request::get(server.url.clone()))
        .await
        .unwrap_err();
    assert!(err.is_cancelled());
}

#[tokio::test]
async fn short_body_reports_read_error_with_status() {
    let server = script_server::start(vec![Reply::ok("partial").truncated(100)]);
    let fetcher = Fetcher::new(common::fast_config()).unwrap();

    let res = fetcher.request(&CancellationToken::new(), &server.url).await;

    match res.error() {
        Some(e @ FetchError::ReadBody { code, .. }) => {
            assert_eq!(*code, 200);
            assert!(!e.is_retryable());
        }
        other => panic!("expected body read error, got {:?}", other),
    }
    assert_eq!(server.hits(), 1);
}

#[tokio::test]
async fn short_body_of_server_error_is_retried() {
    let server = script_server::start(vec![
        Reply::status(503, "Service Unavailable").truncated(100),
        Reply::ok("recovered"),
    ]);
    let fetcher = Fetcher::new(common::fast_config()).unwrap();

    let res = fetcher.request(&CancellationToken::new(), &server.url).await;

    assert_eq!(res.outcome.as_ref().ok(), Some(&9));
    assert_eq!(server.hits(), 2);
}

#[tokio::test]
async fn non_http_scheme_is_rejected_without_network() {
    let fetcher = Fetcher::new(common::fast_config()).unwrap();
    let res = fetcher
        .request(&CancellationToken::new(), "ftp://127.0.0.1/file")
        .await;
    match res.error() {
        Some(FetchError::UnsupportedScheme { scheme, .. }) => assert_eq!(scheme, "ftp"),
        other => panic!("expected unsupported scheme, got {:?}", other),
    }

    let executor = Executor::new(&common::fast_config());
    let err = executor
        .execute(&CancellationToken::new(), Request::get("ftp://127.0.0.1/file"))
        .await
        .unwrap_err();
    assert!(matches!(err, FetchError::UnsupportedScheme { .. }), "{:?}", err);
}
