//! Entry points for callers: trigger a job, POST, GET.
//!
//! POSTs run through the concurrency gate, then the retry loop, then one
//! executor attempt per iteration. GETs skip the gate and never carry a
//! crumb.

use std::sync::Arc;
use std::time::Duration;

use crate::auth::AuthCapability;
use crate::context::CallContext;
use crate::control::CancelToken;
use crate::crumb::{self, Crumb, CrumbCache};
use crate::error::TriggerError;
use crate::executor::Executor;
use crate::form::{PostParams, PostValue};
use crate::gate::{with_gate, PermitPool};
use crate::macros::{apply_macro_replacements, apply_macro_replacements_to_params, MacroExpander};
use crate::response::ConnectionResponse;
use crate::retry::{run_with_retry, RetryPolicy};
use crate::transport::{CurlTransport, Method, Transport};
use crate::url_model::{build_trigger_url, crumb_issuer_url, url_without_parameters};

/// Per-call knobs.
#[derive(Debug, Clone, Copy)]
pub struct CallOptions<'a> {
    pub poll_interval: Duration,
    pub retry_limit: u32,
    /// Takes precedence over the server's own auth unless it is the no-op kind.
    pub override_auth: Option<&'a dyn AuthCapability>,
    pub crumb_cache_enabled: bool,
    /// Cancels this call's retry sleep and permit wait. Calls without a token
    /// cannot be cancelled.
    pub cancel: Option<&'a CancelToken>,
}

impl Default for CallOptions<'_> {
    fn default() -> Self {
        let policy = RetryPolicy::default();
        Self {
            poll_interval: policy.poll_interval,
            retry_limit: policy.retry_limit,
            override_auth: None,
            crumb_cache_enabled: true,
            cancel: None,
        }
    }
}

impl CallOptions<'_> {
    pub fn policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.poll_interval, self.retry_limit)
    }
}

/// Client for one or more remote build servers.
///
/// Cheap to share by reference across threads; the crumb cache is shared by
/// every call made through it. Cancellation is per call, see
/// [`CallOptions::cancel`].
pub struct RemoteClient {
    transport: Arc<dyn Transport>,
    crumbs: Arc<CrumbCache>,
    proxy: Option<String>,
    expander: Option<Arc<dyn MacroExpander>>,
}

impl RemoteClient {
    pub fn new(transport: impl Transport + 'static) -> Self {
        Self {
            transport: Arc::new(transport),
            crumbs: Arc::new(CrumbCache::default()),
            proxy: None,
            expander: None,
        }
    }

    /// Client over libcurl.
    pub fn curl() -> Self {
        Self::new(CurlTransport::new())
    }

    pub fn with_crumb_cache(mut self, crumbs: Arc<CrumbCache>) -> Self {
        self.crumbs = crumbs;
        self
    }

    /// Proxy for servers flagged `use_proxy`.
    pub fn with_proxy(mut self, proxy: Option<String>) -> Self {
        self.proxy = proxy.filter(|p| !p.trim().is_empty());
        self
    }

    pub fn with_macro_expander(mut self, expander: Arc<dyn MacroExpander>) -> Self {
        self.expander = Some(expander);
        self
    }

    pub fn crumb_cache(&self) -> &Arc<CrumbCache> {
        &self.crumbs
    }

    fn executor(&self) -> Executor<'_> {
        Executor::new(self.transport.as_ref(), &self.crumbs).with_proxy_url(self.proxy.as_deref())
    }

    /// Gated, retried POST of `params` to `url`.
    pub fn post(
        &self,
        url: &str,
        ctx: &CallContext,
        params: Option<&PostParams>,
        opts: &CallOptions<'_>,
        gate: Option<&PermitPool>,
    ) -> Result<ConnectionResponse, TriggerError> {
        let exec = self.executor();
        let idle = CancelToken::new();
        let cancel = opts.cancel.unwrap_or(&idle);
        with_gate(gate, opts.poll_interval, cancel, ctx, || {
            run_with_retry(&opts.policy(), cancel, ctx, url, |_| {
                exec.send_once(
                    url,
                    Method::Post,
                    ctx,
                    params,
                    opts.override_auth,
                    opts.crumb_cache_enabled,
                )
            })
        })
    }

    /// Retried GET. Never gated, never sends a crumb.
    pub fn get(
        &self,
        url: &str,
        ctx: &CallContext,
        opts: &CallOptions<'_>,
    ) -> Result<ConnectionResponse, TriggerError> {
        let exec = self.executor();
        let idle = CancelToken::new();
        run_with_retry(&opts.policy(), opts.cancel.unwrap_or(&idle), ctx, url, |_| {
            exec.send_once(
                url,
                Method::Get,
                ctx,
                None,
                opts.override_auth,
                opts.crumb_cache_enabled,
            )
        })
    }

    /// Like [`get`](Self::get) but returns the response text as received.
    pub fn get_raw(
        &self,
        url: &str,
        ctx: &CallContext,
        opts: &CallOptions<'_>,
    ) -> Result<String, TriggerError> {
        self.get(url, ctx, opts).map(|resp| resp.raw_body)
    }

    /// Crumb for the context's server, retried like any other GET.
    pub fn crumb(&self, ctx: &CallContext, opts: &CallOptions<'_>) -> Result<Crumb, TriggerError> {
        let exec = self.executor();
        let url = crumb_issuer_url(ctx)?;
        let idle = CancelToken::new();
        run_with_retry(&opts.policy(), opts.cancel.unwrap_or(&idle), ctx, &url, |_| {
            crumb::get_crumb(&exec, ctx, opts.override_auth, opts.crumb_cache_enabled)
        })
    }

    /// Trigger `job` on the context's server.
    ///
    /// Text parameters travel in the query string; file parameters, if any,
    /// in a multipart body. Macros in the job, token and text values are
    /// expanded first when an expander is installed.
    #[allow(clippy::too_many_arguments)]
    pub fn trigger(
        &self,
        job: &str,
        token: &str,
        params: &PostParams,
        is_parameterized: bool,
        ctx: &CallContext,
        opts: &CallOptions<'_>,
        gate: Option<&PermitPool>,
    ) -> Result<ConnectionResponse, TriggerError> {
        let expander = self.expander.as_deref();
        let job = apply_macro_replacements(expander, ctx, job)?;
        let token = apply_macro_replacements(expander, ctx, token)?;
        let params = apply_macro_replacements_to_params(expander, ctx, params)?;

        let mut query = Vec::new();
        let mut files = PostParams::new();
        for (key, value) in params {
            match value {
                PostValue::Text(text) => query.push((key, text)),
                file => {
                    files.insert(key, file);
                }
            }
        }

        let url = build_trigger_url(
            &job,
            &token,
            &query,
            is_parameterized || !files.is_empty(),
            ctx,
        )?;
        ctx.log(&format!(
            "Triggering remote job now: {}",
            url_without_parameters(&url)
        ));
        let body = (!files.is_empty()).then_some(&files);
        self.post(&url, ctx, body, opts, gate)
    }
}

impl std::fmt::Debug for RemoteClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoteClient")
            .field("crumbs", &self.crumbs.len())
            .field("proxy", &self.proxy)
            .field("expander", &self.expander.is_some())
            .finish()
    }
}
