//! Wire dumps of requests and responses for debug mode.

use url::Url;

use super::parse::final_response;

/// Receives full request/response dumps when debug mode is on.
///
/// Injected into the executor; implementations must not fail or block for long.
pub trait DiagnosticSink: Send + Sync {
    fn request(&self, dump: &str);
    fn response(&self, dump: &str);
}

/// Default sink: `debug`-level events on the `plato_core::wire` target.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl DiagnosticSink for TracingSink {
    fn request(&self, dump: &str) {
        tracing::debug!(target: "plato_core::wire", "request:\n{}", dump);
    }

    fn response(&self, dump: &str) {
        tracing::debug!(target: "plato_core::wire", "response:\n{}", dump);
    }
}

/// Formats an outgoing request the way it goes on the wire (HTTP/1.1 framing).
pub(crate) fn format_request(
    method: &str,
    url: &str,
    headers: &[String],
    body: Option<&[u8]>,
) -> String {
    let (target, host) = match Url::parse(url) {
        Ok(u) => {
            let mut target = u.path().to_string();
            if let Some(q) = u.query() {
                target.push('?');
                target.push_str(q);
            }
            let host = match (u.host_str(), u.port()) {
                (Some(h), Some(p)) => format!("{}:{}", h, p),
                (Some(h), None) => h.to_string(),
                _ => String::new(),
            };
            (target, host)
        }
        Err(_) => (url.to_string(), String::new()),
    };

    let mut out = format!("{} {} HTTP/1.1\r\nHost: {}\r\n", method, target, host);
    for h in headers {
        out.push_str(h);
        out.push_str("\r\n");
    }
    out.push_str("\r\n");
    if let Some(body) = body {
        out.push_str(&String::from_utf8_lossy(body));
    }
    out
}

/// Formats the final response of an exchange: status line, headers, body.
pub(crate) fn format_response(header_lines: &[String], body: &[u8]) -> String {
    let mut out = String::new();
    for line in final_response(header_lines) {
        out.push_str(line);
        out.push_str("\r\n");
    }
    out.push_str("\r\n");
    out.push_str(&String::from_utf8_lossy(body));
    out
}
