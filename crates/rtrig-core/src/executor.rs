//! One authenticated request, built, sent and classified.
//!
//! The executor never retries. Transport failures come back as
//! [`TriggerError::Transient`] for the retry loop to deal with; 401, 403 and
//! 404 come back as terminal errors.

use std::time::Instant;

use crate::auth::{resolve_auth, AuthCapability};
use crate::context::{CallContext, RemoteServer};
use crate::crumb::{self, CrumbCache};
use crate::error::TriggerError;
use crate::form::{self, PostParams};
use crate::response::{may_be_json, parse_json_object, ConnectionResponse};
use crate::transport::{
    HttpRequest, Method, ProxyMode, RawResponse, RequestBuilder, Transport, TransportErrorKind,
};
use crate::url_model::url_without_parameters;

/// Sends single requests over a transport, sharing one crumb cache.
#[derive(Clone, Copy)]
pub struct Executor<'a> {
    transport: &'a dyn Transport,
    crumbs: &'a CrumbCache,
    proxy_url: Option<&'a str>,
}

impl<'a> Executor<'a> {
    pub fn new(transport: &'a dyn Transport, crumbs: &'a CrumbCache) -> Self {
        Self {
            transport,
            crumbs,
            proxy_url: None,
        }
    }

    /// Explicit proxy for servers with `use_proxy`; without one the
    /// environment's proxy settings apply.
    pub fn with_proxy_url(mut self, proxy_url: Option<&'a str>) -> Self {
        self.proxy_url = proxy_url;
        self
    }

    pub fn crumbs(&self) -> &'a CrumbCache {
        self.crumbs
    }

    fn proxy_for(&self, server: &RemoteServer) -> ProxyMode {
        match (server.use_proxy, self.proxy_url) {
            (false, _) => ProxyMode::Direct,
            (true, Some(url)) => ProxyMode::Url(url.to_string()),
            (true, None) => ProxyMode::System,
        }
    }

    /// Request builder routed per the server's proxy setting and carrying
    /// the effective authorization header.
    pub fn authorized_request(
        &self,
        method: Method,
        url: &str,
        ctx: &CallContext,
        override_auth: Option<&dyn AuthCapability>,
    ) -> Result<RequestBuilder, TriggerError> {
        let mut request = HttpRequest::builder(method, url);
        request.proxy(self.proxy_for(&ctx.server));
        let (source, auth) = resolve_auth(override_auth, &ctx.server);
        tracing::trace!(?source, "resolved authentication");
        if let Some(auth) = auth {
            auth.apply(&mut request, ctx)?;
        }
        Ok(request)
    }

    /// Run `request` on the transport, timing the exchange.
    pub fn execute(&self, request: &HttpRequest) -> Result<RawResponse, TriggerError> {
        let clean_url = url_without_parameters(&request.url);
        tracing::trace!(method = %request.method, url = %clean_url, "request begin");
        let started = Instant::now();
        let result = self.transport.execute(request);
        tracing::debug!(
            method = %request.method,
            url = %clean_url,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "request end"
        );

        result.map_err(|source| match source.kind {
            TransportErrorKind::InvalidRequest => {
                TriggerError::Configuration(format!("cannot request {clean_url}: {}", source.message))
            }
            _ => TriggerError::Transient {
                url: clean_url,
                source,
            },
        })
    }

    /// Build, send and classify one request.
    ///
    /// POST bodies are encoded from `post_params` (multipart when any value is
    /// a file) and carry the server's crumb; GET requests carry neither.
    pub fn send_once(
        &self,
        url: &str,
        method: Method,
        ctx: &CallContext,
        post_params: Option<&PostParams>,
        override_auth: Option<&dyn AuthCapability>,
        cache_enabled: bool,
    ) -> Result<ConnectionResponse, TriggerError> {
        let body = match post_params {
            Some(params) if method == Method::Post && !params.is_empty() => {
                Some(form::encode_body(params)?)
            }
            _ => None,
        };

        let mut request = self.authorized_request(method, url, ctx, override_auth)?;
        request.set_header("Accept", "application/json");
        request.set_header("Accept-Language", "UTF-8");
        crumb::add_crumb_to_request(self, &mut request, ctx, override_auth, cache_enabled)?;
        if method == Method::Post {
            let (content_type, bytes) = match body {
                Some(body) => (body.content_type, body.bytes),
                None => ("application/x-www-form-urlencoded".to_string(), Vec::new()),
            };
            request.set_header("Content-Type", content_type);
            request.set_header("Content-Length", bytes.len().to_string());
            request.body(bytes);
        }

        let raw = self.execute(&request.build())?;
        classify_response(url, raw)
    }
}

/// Map a raw response to the caller-facing result.
pub fn classify_response(url: &str, raw: RawResponse) -> Result<ConnectionResponse, TriggerError> {
    let clean_url = url_without_parameters(url);
    match raw.status {
        401 | 403 => {
            if let Some(line) = &raw.status_line {
                tracing::warn!(url = %clean_url, "{}", line);
            }
            return Err(if raw.status == 401 {
                TriggerError::Unauthorized { url: clean_url }
            } else {
                TriggerError::Forbidden { url: clean_url }
            });
        }
        404 => return Err(TriggerError::NotFound { url: clean_url }),
        _ => {}
    }

    let text = raw.body_text();
    let body = if raw.status >= 400 || !may_be_json(&text) {
        None
    } else {
        parse_json_object(&text)
    };

    Ok(ConnectionResponse {
        status: raw.status,
        headers: raw.headers,
        body,
        raw_body: text,
    })
}
