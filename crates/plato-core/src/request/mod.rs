//! HTTP request execution.
//!
//! Uses the curl crate (libcurl), one `Easy` handle per request, run on the
//! tokio blocking pool. Transport failures are mapped into [`FetchError`]
//! kinds so the retry loop can classify them.

mod dump;
mod parse;

pub use dump::{DiagnosticSink, TracingSink};

use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use crate::config::{FetcherConfig, TimeoutConfig};
use crate::retry::FetchError;
use crate::url_model;

/// Identifies this client on every request.
pub const USER_AGENT: &str = concat!("plato-fetcher/", env!("CARGO_PKG_VERSION"));

/// Bytes of an error response body kept in the `Http` error message.
const ERROR_BODY_LIMIT: usize = 512;

const MAX_REDIRECTS: u32 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Head,
    Post,
    Put,
    Delete,
}

impl Method {
    pub fn as_str(self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Head => "HEAD",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Delete => "DELETE",
        }
    }
}

/// One outgoing request.
#[derive(Debug, Clone)]
pub struct Request {
    pub method: Method,
    pub url: String,
    pub body: Option<Vec<u8>>,
    /// Raw query string; replaces any query already present in `url`.
    pub query: Option<String>,
}

impl Request {
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            method: Method::Get,
            url: url.into(),
            body: None,
            query: None,
        }
    }

    pub fn with_method(mut self, method: Method) -> Self {
        self.method = method;
        self
    }

    pub fn with_body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = Some(body.into());
        self
    }

    pub fn with_query(mut self, query: impl Into<String>) -> Self {
        self.query = Some(query.into());
        self
    }
}

/// Issues single HTTP exchanges. Cheap to clone and shared read-only by all workers.
#[derive(Clone)]
pub struct Executor {
    timeouts: TimeoutConfig,
    debug: bool,
    insecure_tls: bool,
    sink: Arc<dyn DiagnosticSink>,
}

impl std::fmt::Debug for Executor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Executor")
            .field("timeouts", &self.timeouts)
            .field("debug", &self.debug)
            .field("insecure_tls", &self.insecure_tls)
            .finish_non_exhaustive()
    }
}

impl Executor {
    /// Executor logging dumps through [`TracingSink`] when `cfg.debug` is set.
    pub fn new(cfg: &FetcherConfig) -> Self {
        Self {
            timeouts: cfg.timeouts.clone(),
            debug: cfg.debug,
            insecure_tls: cfg.insecure_tls,
            sink: Arc::new(TracingSink),
        }
    }

    /// Replace the diagnostic sink (dumps are still only produced in debug mode).
    pub fn with_sink(mut self, sink: Arc<dyn DiagnosticSink>) -> Self {
        self.sink = sink;
        self
    }

    /// Performs one exchange and returns the full response body.
    ///
    /// Returns [`FetchError::Cancelled`] as soon as `cancel` fires; the blocking
    /// transfer notices the token in its progress callback and aborts itself.
    pub async fn execute(
        &self,
        cancel: &CancellationToken,
        req: Request,
    ) -> Result<Vec<u8>, FetchError> {
        let exchange = self.clone();
        let token = cancel.clone();
        let handle = tokio::task::spawn_blocking(move || exchange.perform(&token, req));
        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(FetchError::Cancelled),
            joined = handle => joined.map_err(|e| FetchError::Task(e.to_string()))?,
        }
    }

    /// Blocking part of [`Executor::execute`]. The curl handle lives only in
    /// this call, so it is released on every return path.
    fn perform(&self, cancel: &CancellationToken, req: Request) -> Result<Vec<u8>, FetchError> {
        let url = match &req.query {
            Some(q) => url_model::with_query(&req.url, q).map_err(|source| {
                FetchError::InvalidUrl {
                    url: req.url.clone(),
                    source,
                }
            })?,
            None => req.url.clone(),
        };
        let parsed = url::Url::parse(&url).map_err(|source| FetchError::InvalidUrl {
            url: url.clone(),
            source,
        })?;
        url_model::check_scheme(&url, &parsed)?;

        let mut headers = vec![format!("User-Agent: {}", USER_AGENT), "Accept: */*".to_string()];
        if let Some(body) = &req.body {
            headers.push(format!("Content-Length: {}", body.len()));
        }

        if self.debug {
            self.sink.request(&dump::format_request(
                req.method.as_str(),
                &url,
                &headers,
                req.body.as_deref(),
            ));
        }

        let mut easy = curl::easy::Easy::new();
        self.configure(&mut easy, &url, &req, &headers)
            .map_err(FetchError::Request)?;

        let mut header_lines: Vec<String> = Vec::new();
        let mut body: Vec<u8> = Vec::new();
        let performed = {
            let mut transfer = easy.transfer();
            transfer
                .header_function(|data| {
                    header_lines.push(String::from_utf8_lossy(data).trim_end().to_string());
                    true
                })
                .map_err(FetchError::Request)?;
            transfer
                .write_function(|data| {
                    body.extend_from_slice(data);
                    Ok(data.len())
                })
                .map_err(FetchError::Request)?;
            transfer
                .progress_function(|_, _, _, _| !cancel.is_cancelled())
                .map_err(FetchError::Request)?;
            transfer.perform()
        };

        let status = parse::final_status(&header_lines);

        if let Err(e) = performed {
            if e.is_aborted_by_callback() && cancel.is_cancelled() {
                return Err(FetchError::Cancelled);
            }
            if e.is_operation_timedout() {
                return Err(FetchError::Timeout(e));
            }
            return match status {
                Some(s) => {
                    if self.debug {
                        self.sink
                            .response(&dump::format_response(&header_lines, &body));
                    }
                    Err(FetchError::ReadBody {
                        code: s.code,
                        source: e,
                    })
                }
                None => Err(FetchError::Transport(e)),
            };
        }

        if self.debug {
            self.sink
                .response(&dump::format_response(&header_lines, &body));
        }

        // A redirect may have left http(s); its status cannot be trusted.
        if let Ok(Some(effective)) = easy.effective_url() {
            if let Ok(landed) = url::Url::parse(effective) {
                url_model::check_scheme(effective, &landed)?;
            }
        }

        let (code, reason) = match status {
            Some(s) => (s.code, s.reason),
            None => (
                easy.response_code().map_err(FetchError::Transport)?,
                String::new(),
            ),
        };
        if code >= 400 {
            return Err(FetchError::Http {
                code,
                message: http_error_message(&reason, &body),
            });
        }
        Ok(body)
    }

    fn configure(
        &self,
        easy: &mut curl::easy::Easy,
        url: &str,
        req: &Request,
        headers: &[String],
    ) -> Result<(), curl::Error> {
        easy.url(url)?;
        match (&req.body, req.method) {
            (Some(body), method) => {
                easy.post_fields_copy(body)?;
                if method != Method::Post {
                    easy.custom_request(method.as_str())?;
                }
            }
            (None, Method::Get) => easy.get(true)?,
            (None, Method::Head) => easy.nobody(true)?,
            (None, Method::Post) => easy.post_fields_copy(&[])?,
            (None, method) => easy.custom_request(method.as_str())?,
        }
        easy.follow_location(true)?;
        easy.max_redirections(MAX_REDIRECTS)?;
        easy.connect_timeout(self.timeouts.connect_timeout())?;
        easy.timeout(self.timeouts.request_timeout())?;
        if self.insecure_tls {
            easy.ssl_verify_peer(false)?;
            easy.ssl_verify_host(false)?;
        }

        let mut list = curl::easy::List::new();
        for h in headers {
            list.append(h)?;
        }
        easy.http_headers(list)?;

        // Needed so the progress callback (cancellation check) runs.
        easy.progress(true)?;
        Ok(())
    }
}

/// `Service Unavailable. Content: <body, truncated>`.
fn http_error_message(reason: &str, body: &[u8]) -> String {
    let truncated = body.len() > ERROR_BODY_LIMIT;
    let mut content =
        String::from_utf8_lossy(&body[..body.len().min(ERROR_BODY_LIMIT)]).into_owned();
    if truncated {
        content.push_str("...");
    }
    match (reason.is_empty(), content.is_empty()) {
        (true, true) => "no content".to_string(),
        (false, true) => reason.to_string(),
        (true, false) => format!("Content: {}", content),
        (false, false) => format!("{}. Content: {}", reason, content),
    }
}
