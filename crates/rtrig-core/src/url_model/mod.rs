//! URL modeling for remote jobs.
//!
//! Builds job URLs from folder-style job names (`team/app` becomes
//! `/job/team/job/app`), assembles trigger URLs for both address shapes the
//! remote supports, and strips query strings for anything that gets logged.

mod encode;
mod trigger;

pub use encode::{encode_pair, encode_value, join_query};
pub use trigger::{build_trigger_url, build_type_suffix, crumb_issuer_url, crumb_issuer_url_at};

use crate::context::RemoteServer;
use crate::error::TriggerError;

/// True if `s` is an absolute `http`/`https` URL with a host.
pub fn is_absolute_url(s: &str) -> bool {
    match url::Url::parse(s) {
        Ok(u) => matches!(u.scheme(), "http" | "https") && u.has_host(),
        Err(_) => false,
    }
}

/// Server address without trailing slashes, or a configuration error.
pub(crate) fn base_address(server: &RemoteServer) -> Result<String, TriggerError> {
    let address = server.address().ok_or_else(TriggerError::missing_address)?;
    Ok(address.trim_end_matches('/').to_string())
}

/// URL of a job on `server`.
///
/// An absolute URL is returned unchanged. Otherwise the name is split on `/`
/// and each segment is appended as `/job/<segment>`.
pub fn generate_job_url(server: &RemoteServer, job_name_or_url: &str) -> Result<String, TriggerError> {
    let job = job_name_or_url.trim();
    if job.is_empty() {
        return Err(TriggerError::Configuration(format!(
            "invalid job name/url: {job_name_or_url:?}"
        )));
    }
    if is_absolute_url(job) {
        return Ok(job.to_string());
    }

    let mut url = base_address(server)?;
    for segment in job.split('/').filter(|s| !s.is_empty()) {
        url.push_str("/job/");
        url.push_str(&encode_value(segment));
    }
    Ok(url)
}

/// `url` reduced to scheme, host and path. Query, fragment and userinfo are
/// dropped so tokens and parameters never reach a log line.
pub fn url_without_parameters(url: &str) -> String {
    match url::Url::parse(url) {
        Ok(mut u) => {
            u.set_query(None);
            u.set_fragment(None);
            let _ = u.set_username("");
            let _ = u.set_password(None);
            u.to_string()
        }
        Err(_) => url.split(['?', '#']).next().unwrap_or_default().to_string(),
    }
}
