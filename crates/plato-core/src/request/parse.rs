//! Parse collected response header lines (possibly spanning redirects).

/// Status line of the final response in a redirect chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct StatusLine {
    pub code: u32,
    pub reason: String,
}

/// Parses `HTTP/1.1 503 Service Unavailable` (reason may be absent, e.g. HTTP/2).
pub(crate) fn parse_status_line(line: &str) -> Option<StatusLine> {
    let line = line.trim();
    if !line.starts_with("HTTP/") {
        return None;
    }
    let mut parts = line.splitn(3, ' ');
    let _version = parts.next()?;
    let code = parts.next()?.trim().parse::<u32>().ok()?;
    let reason = parts.next().unwrap_or("").trim().to_string();
    Some(StatusLine { code, reason })
}

/// Header lines of the last response: everything from the last status line on,
/// with the trailing blank separator dropped.
pub(crate) fn final_response(lines: &[String]) -> &[String] {
    let start = lines
        .iter()
        .rposition(|l| l.trim_start().starts_with("HTTP/"))
        .unwrap_or(0);
    let mut end = lines.len();
    while end > start && lines[end - 1].trim().is_empty() {
        end -= 1;
    }
    &lines[start..end]
}

/// Status of the final response, if any status line was received.
pub(crate) fn final_status(lines: &[String]) -> Option<StatusLine> {
    final_response(lines)
        .first()
        .and_then(|l| parse_status_line(l))
}
