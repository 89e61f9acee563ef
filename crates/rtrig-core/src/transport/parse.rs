//! Parse HTTP response header lines into a multi-valued map.

use super::HeaderMap;

/// Parse collected header lines into the final status line and header map.
///
/// libcurl reports every header block it sees (e.g. an interim
/// `100 Continue` before the real response); only the last block is kept.
pub fn parse_header_lines(lines: &[String]) -> (Option<String>, HeaderMap) {
    let mut status_line = None;
    let mut headers = HeaderMap::new();

    for line in lines {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if line.starts_with("HTTP/") {
            status_line = Some(line.to_string());
            headers.clear();
            continue;
        }
        if let Some((name, value)) = line.split_once(':') {
            headers
                .entry(name.trim().to_ascii_lowercase())
                .or_default()
                .push(value.trim().to_string());
        }
    }

    (status_line, headers)
}
