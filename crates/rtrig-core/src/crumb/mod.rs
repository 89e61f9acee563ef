//! CSRF crumb negotiation.
//!
//! State-changing (POST) calls must carry the remote's crumb header when CSRF
//! protection is on. The crumb is fetched from the crumb issuer once per host
//! and cached; a 404 from the issuer means protection is off, which is
//! cached as a disabled crumb so the issuer is not asked again.

mod cache;
mod key;

use std::fmt;

pub use cache::{CrumbCache, DEFAULT_CRUMB_TTL};
pub use key::HostKey;

use crate::auth::AuthCapability;
use crate::context::CallContext;
use crate::error::TriggerError;
use crate::executor::Executor;
use crate::transport::{Method, RequestBuilder};
use crate::url_model::{crumb_issuer_url, crumb_issuer_url_at, url_without_parameters};

/// A CSRF token and the header it travels in.
#[derive(Clone, PartialEq, Eq)]
pub struct Crumb {
    header_name: String,
    value: String,
    enabled_on_remote: bool,
}

impl Crumb {
    pub fn enabled(header_name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            header_name: header_name.into(),
            value: value.into(),
            enabled_on_remote: true,
        }
    }

    /// Marker for a remote without CSRF protection.
    pub fn disabled() -> Self {
        Self {
            header_name: String::new(),
            value: String::new(),
            enabled_on_remote: false,
        }
    }

    pub fn header_name(&self) -> &str {
        &self.header_name
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled_on_remote
    }
}

impl fmt::Debug for Crumb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Crumb")
            .field("header_name", &self.header_name)
            .field("value", &"<redacted>")
            .field("enabled_on_remote", &self.enabled_on_remote)
            .finish()
    }
}

/// Parse an issuer body of the form `<headerName>:<crumbValue>`.
///
/// Only the first `:` separates the two halves.
pub fn parse_crumb(body: &str) -> Option<Crumb> {
    let (name, value) = body.trim().split_once(':')?;
    let name = name.trim();
    if name.is_empty() {
        return None;
    }
    Some(Crumb::enabled(name, value.trim()))
}

/// Crumb for the call's server, from cache when allowed, else from the issuer.
pub fn get_crumb(
    exec: &Executor<'_>,
    ctx: &CallContext,
    override_auth: Option<&dyn AuthCapability>,
    cache_enabled: bool,
) -> Result<Crumb, TriggerError> {
    let crumb_url = crumb_issuer_url(ctx)?;
    fetch_crumb(exec, ctx, &crumb_url, override_auth, cache_enabled)
}

/// Issuer whose crumb is valid for `target_url`.
///
/// A target on the server's own host uses the server's issuer (keeping any
/// path prefix of the address); any other target uses the issuer at its own
/// origin.
pub fn issuer_for(ctx: &CallContext, target_url: &str) -> Result<String, TriggerError> {
    let target = HostKey::from_url(target_url)?;
    if ctx.server.address().is_some() {
        let own = crumb_issuer_url(ctx)?;
        if HostKey::from_url(&own)? == target {
            return Ok(own);
        }
    }
    let origin = url::Url::parse(target_url)
        .map(|u| u.origin().ascii_serialization())
        .map_err(|e| TriggerError::Configuration(format!("invalid url: {e}")))?;
    ctx.log(&format!(
        "{} is not the configured server, asking its own crumb issuer",
        target.host
    ));
    Ok(crumb_issuer_url_at(&origin))
}

fn fetch_crumb(
    exec: &Executor<'_>,
    ctx: &CallContext,
    crumb_url: &str,
    override_auth: Option<&dyn AuthCapability>,
    cache_enabled: bool,
) -> Result<Crumb, TriggerError> {
    let host = HostKey::from_url(crumb_url)?;

    if cache_enabled {
        if let Some(crumb) = exec.crumbs().get(&host) {
            ctx.log(&format!("reuse cached crumb: {}", host.host));
            return Ok(crumb);
        }
    }

    let request = exec
        .authorized_request(Method::Get, crumb_url, ctx, override_auth)?
        .build();
    let raw = exec.execute(&request)?;
    let clean_url = url_without_parameters(crumb_url);

    match raw.status {
        401 => Err(TriggerError::Unauthorized { url: clean_url }),
        403 => Err(TriggerError::Forbidden { url: clean_url }),
        404 => {
            ctx.log("CSRF protection is disabled on the remote server.");
            Ok(exec.crumbs().put(host, Crumb::disabled(), cache_enabled))
        }
        200 => {
            ctx.log("CSRF protection is enabled on the remote server.");
            let crumb = parse_crumb(&raw.body_text()).ok_or_else(|| TriggerError::Protocol {
                url: clean_url.clone(),
                status: 200,
                message: "crumb issuer body is not <field>:<crumb>".to_string(),
            })?;
            Ok(exec.crumbs().put(host, crumb, cache_enabled))
        }
        status => Err(TriggerError::Protocol {
            url: clean_url,
            status,
            message: raw
                .status_line
                .unwrap_or_else(|| "unexpected response".to_string()),
        }),
    }
}

/// Put the crumb header on a POST. Other methods are left untouched and
/// never cause a crumb lookup. The crumb always comes from the request
/// URL's own host.
pub fn add_crumb_to_request(
    exec: &Executor<'_>,
    request: &mut RequestBuilder,
    ctx: &CallContext,
    override_auth: Option<&dyn AuthCapability>,
    cache_enabled: bool,
) -> Result<(), TriggerError> {
    if request.method() != Method::Post {
        return Ok(());
    }
    let crumb_url = issuer_for(ctx, request.url())?;
    let crumb = fetch_crumb(exec, ctx, &crumb_url, override_auth, cache_enabled)?;
    if crumb.is_enabled() {
        request.set_header(crumb.header_name(), crumb.value());
    }
    Ok(())
}
