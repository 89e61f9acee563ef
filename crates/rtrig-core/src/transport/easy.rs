//! libcurl transport: one `Easy` handle per request.
//!
//! The handle lives only for the duration of `execute`, so the connection is
//! torn down on every exit path. Redirects are not followed; a trigger
//! endpoint answers 201 with a `Location` header that callers read directly.

use std::str;

use super::{
    classify_curl_error, parse_header_lines, HttpRequest, Method, ProxyMode, RawResponse,
    Transport, TransportError, TransportErrorKind,
};

/// Blocking transport backed by the curl crate (libcurl).
///
/// Runs in the calling thread; call from `spawn_blocking` if used from async code.
#[derive(Debug, Clone, Copy, Default)]
pub struct CurlTransport;

impl CurlTransport {
    pub fn new() -> Self {
        Self
    }
}

fn curl_err(e: curl::Error) -> TransportError {
    TransportError::new(classify_curl_error(&e), e.to_string())
}

impl Transport for CurlTransport {
    fn execute(&self, request: &HttpRequest) -> Result<RawResponse, TransportError> {
        let mut header_lines: Vec<String> = Vec::new();
        let mut body: Vec<u8> = Vec::new();

        let mut easy = curl::easy::Easy::new();
        easy.url(&request.url).map_err(curl_err)?;
        match request.method {
            Method::Get => easy.get(true).map_err(curl_err)?,
            Method::Post => {
                easy.post(true).map_err(curl_err)?;
                easy.post_field_size(request.body.len() as u64)
                    .map_err(curl_err)?;
                easy.post_fields_copy(&request.body).map_err(curl_err)?;
            }
        }
        easy.connect_timeout(request.connect_timeout)
            .map_err(curl_err)?;
        // No byte for `read_timeout` aborts the transfer.
        easy.low_speed_limit(1).map_err(curl_err)?;
        easy.low_speed_time(request.read_timeout)
            .map_err(curl_err)?;
        match &request.proxy {
            ProxyMode::Direct => easy.noproxy("*").map_err(curl_err)?,
            ProxyMode::System => {}
            ProxyMode::Url(proxy) => easy.proxy(proxy).map_err(curl_err)?,
        }

        let mut list = curl::easy::List::new();
        for (k, v) in &request.headers {
            list.append(&format!("{}: {}", k.trim(), v.trim()))
                .map_err(curl_err)?;
        }
        if request.method == Method::Post {
            // Suppress `Expect: 100-continue` on large multipart bodies.
            list.append("Expect:").map_err(curl_err)?;
        }
        easy.http_headers(list).map_err(curl_err)?;

        {
            let mut transfer = easy.transfer();
            transfer
                .header_function(|data| {
                    if let Ok(s) = str::from_utf8(data) {
                        header_lines.push(s.trim_end().to_string());
                    }
                    true
                })
                .map_err(curl_err)?;
            transfer
                .write_function(|data| {
                    body.extend_from_slice(data);
                    Ok(data.len())
                })
                .map_err(curl_err)?;
            transfer.perform().map_err(curl_err)?;
        }

        let status = easy.response_code().map_err(curl_err)?;
        if status == 0 {
            return Err(TransportError::new(
                TransportErrorKind::Connection,
                "no status line received",
            ));
        }
        let (status_line, headers) = parse_header_lines(&header_lines);

        Ok(RawResponse {
            status,
            status_line,
            headers,
            body,
        })
    }
}
