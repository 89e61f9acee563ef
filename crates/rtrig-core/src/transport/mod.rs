//! HTTP transport seam.
//!
//! Requests are immutable descriptors built once per attempt and handed to a
//! [`Transport`]. The production implementation is [`CurlTransport`]; tests
//! inject scripted transports instead of touching the network.

mod classify;
mod easy;
mod parse;
#[cfg(test)]
pub(crate) mod testing;

use std::collections::HashMap;
use std::fmt;
use std::time::Duration;

pub use classify::classify_curl_error;
pub use easy::CurlTransport;
pub use parse::parse_header_lines;

/// Multi-valued response headers keyed by lower-cased header name.
pub type HeaderMap = HashMap<String, Vec<String>>;

/// Time allowed to establish a connection.
pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
/// Time allowed without receiving response data.
pub const READ_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
}

impl Method {
    pub fn as_str(self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How the connection is routed.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ProxyMode {
    /// Never use a proxy, even if the environment names one.
    #[default]
    Direct,
    /// Use whatever the environment configures (`http_proxy`, ...).
    System,
    /// Use the given proxy URL.
    Url(String),
}

/// One outbound request, fully described.
#[derive(Clone)]
pub struct HttpRequest {
    pub method: Method,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
    pub proxy: ProxyMode,
    pub connect_timeout: Duration,
    pub read_timeout: Duration,
}

// Header values can carry credentials; only names are printed.
impl fmt::Debug for HttpRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.headers.iter().map(|(k, _)| k.as_str()).collect();
        f.debug_struct("HttpRequest")
            .field("method", &self.method)
            .field("url", &crate::url_model::url_without_parameters(&self.url))
            .field("headers", &names)
            .field("body_len", &self.body.len())
            .field("proxy", &self.proxy)
            .finish()
    }
}

impl HttpRequest {
    pub fn builder(method: Method, url: impl Into<String>) -> RequestBuilder {
        RequestBuilder {
            method,
            url: url.into(),
            headers: Vec::new(),
            body: Vec::new(),
            proxy: ProxyMode::Direct,
            connect_timeout: CONNECT_TIMEOUT,
            read_timeout: READ_TIMEOUT,
        }
    }

    /// First value of a request header (case-insensitive).
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// Mutable staging area for an [`HttpRequest`]. Authentication and crumb
/// handling write headers here before the descriptor is frozen.
#[derive(Debug)]
pub struct RequestBuilder {
    method: Method,
    url: String,
    headers: Vec<(String, String)>,
    body: Vec<u8>,
    proxy: ProxyMode,
    connect_timeout: Duration,
    read_timeout: Duration,
}

impl RequestBuilder {
    pub fn method(&self) -> Method {
        self.method
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Set a header, replacing any earlier value with the same name.
    pub fn set_header(&mut self, name: &str, value: impl Into<String>) -> &mut Self {
        self.headers.retain(|(k, _)| !k.eq_ignore_ascii_case(name));
        self.headers.push((name.to_string(), value.into()));
        self
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn body(&mut self, body: Vec<u8>) -> &mut Self {
        self.body = body;
        self
    }

    pub fn proxy(&mut self, proxy: ProxyMode) -> &mut Self {
        self.proxy = proxy;
        self
    }

    pub fn timeouts(&mut self, connect: Duration, read: Duration) -> &mut Self {
        self.connect_timeout = connect;
        self.read_timeout = read;
        self
    }

    pub fn build(self) -> HttpRequest {
        HttpRequest {
            method: self.method,
            url: self.url,
            headers: self.headers,
            body: self.body,
            proxy: self.proxy,
            connect_timeout: self.connect_timeout,
            read_timeout: self.read_timeout,
        }
    }
}

/// What came back over the wire, before any classification.
#[derive(Debug, Clone, Default)]
pub struct RawResponse {
    pub status: u32,
    /// Status line as sent, e.g. `HTTP/1.1 403 No valid crumb was included in the request`.
    pub status_line: Option<String>,
    pub headers: HeaderMap,
    pub body: Vec<u8>,
}

impl RawResponse {
    pub fn new(status: u32) -> Self {
        Self {
            status,
            ..Self::default()
        }
    }

    pub fn with_body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = body.into();
        self
    }

    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers
            .entry(name.to_ascii_lowercase())
            .or_default()
            .push(value.to_string());
        self
    }

    /// Body decoded as UTF-8 (lossy), trimmed.
    pub fn body_text(&self) -> String {
        String::from_utf8_lossy(&self.body).trim().to_string()
    }
}

/// Broad category of a transport failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportErrorKind {
    /// Connect or read timed out.
    Timeout,
    /// Refused, reset, DNS, or the peer hung up.
    Connection,
    /// The request could not be formed (bad URL, unsupported scheme).
    InvalidRequest,
    /// Anything else libcurl reports.
    Other,
}

/// Failure below the HTTP status layer.
#[derive(Debug, Clone, thiserror::Error)]
#[error("{kind:?}: {message}")]
pub struct TransportError {
    pub kind: TransportErrorKind,
    pub message: String,
}

impl TransportError {
    pub fn new(kind: TransportErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

/// Executes one request and returns the raw response.
///
/// Implementations must release any connection resources before returning,
/// on success and on failure alike.
pub trait Transport: Send + Sync {
    fn execute(&self, request: &HttpRequest) -> Result<RawResponse, TransportError>;
}

impl<T: Transport + ?Sized> Transport for std::sync::Arc<T> {
    fn execute(&self, request: &HttpRequest) -> Result<RawResponse, TransportError> {
        (**self).execute(request)
    }
}
