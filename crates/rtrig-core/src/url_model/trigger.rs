//! Trigger and crumb-issuer URLs.

use super::{base_address, encode_pair, encode_value, generate_job_url, join_query};
use crate::context::CallContext;
use crate::error::TriggerError;

const BUILD: &str = "/build";
const BUILD_WITH_PARAMETERS: &str = "/buildWithParameters";
const BUILD_BY_TOKEN: &str = "/buildByToken";
const CRUMB_XPATH: &str = "concat(//crumbRequestField,\":\",//crumb)";

/// `/buildWithParameters` when the job takes parameters or any are supplied.
pub fn build_type_suffix(is_parameterized: bool, has_params: bool) -> &'static str {
    if is_parameterized || has_params {
        BUILD_WITH_PARAMETERS
    } else {
        BUILD
    }
}

/// Fully-encoded URL that triggers `job_name_or_url`.
///
/// Servers with token-root support are addressed through the shared
/// `/buildByToken` endpoint with the job in the query; all others through
/// the job's own path. `delay=0` is always appended.
pub fn build_trigger_url(
    job_name_or_url: &str,
    security_token: &str,
    params: &[(String, String)],
    is_parameterized: bool,
    ctx: &CallContext,
) -> Result<String, TriggerError> {
    let suffix = build_type_suffix(is_parameterized, !params.is_empty());
    let mut query: Vec<String> = Vec::with_capacity(params.len() + 3);

    let mut url = if ctx.server.token_root_support {
        query.push(format!("job={}", encode_value(job_name_or_url)));
        base_address(&ctx.server)? + BUILD_BY_TOKEN
    } else {
        generate_job_url(&ctx.server, job_name_or_url)?
    };
    url.push_str(suffix);

    if !security_token.is_empty() {
        query.push(format!("token={}", encode_value(security_token)));
    }
    query.extend(params.iter().map(|(k, v)| encode_pair(k, v)));
    query.push("delay=0".to_string());

    url.push('?');
    url.push_str(&join_query(&query));
    Ok(url)
}

/// Crumb issuer endpoint of the call's server.
pub fn crumb_issuer_url(ctx: &CallContext) -> Result<String, TriggerError> {
    Ok(crumb_issuer_url_at(&base_address(&ctx.server)?))
}

/// Crumb issuer endpoint under `base` (no trailing slash).
pub fn crumb_issuer_url_at(base: &str) -> String {
    format!(
        "{base}/crumbIssuer/api/xml?xpath={}",
        encode_value(CRUMB_XPATH)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{MemorySink, RemoteServer};
    use std::sync::Arc;

    fn ctx(server: RemoteServer) -> CallContext {
        CallContext::new(server, Arc::new(MemorySink::new()))
    }

    fn params(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn per_job_url_without_params() {
        let c = ctx(RemoteServer::new("ci", "http://h"));
        assert_eq!(
            build_trigger_url("a/b", "tok", &[], false, &c).unwrap(),
            "http://h/job/a/job/b/build?token=tok&delay=0"
        );
    }

    #[test]
    fn params_switch_to_build_with_parameters() {
        let c = ctx(RemoteServer::new("ci", "http://h"));
        let url = build_trigger_url("app", "", &params(&[("BRANCH", "feature/x y")]), false, &c)
            .unwrap();
        assert_eq!(
            url,
            "http://h/job/app/buildWithParameters?BRANCH=feature%2Fx%20y&delay=0"
        );
    }

    #[test]
    fn parameterized_job_without_params() {
        let c = ctx(RemoteServer::new("ci", "http://h"));
        assert_eq!(
            build_trigger_url("app", "", &[], true, &c).unwrap(),
            "http://h/job/app/buildWithParameters?delay=0"
        );
    }

    #[test]
    fn token_root_puts_job_in_query() {
        let c = ctx(RemoteServer::new("ci", "http://h/").with_token_root_support(true));
        let url = build_trigger_url("team/app", "t k", &params(&[("A", "1")]), false, &c).unwrap();
        assert_eq!(
            url,
            "http://h/buildByToken/buildWithParameters?job=team%2Fapp&token=t%20k&A=1&delay=0"
        );
    }

    #[test]
    fn token_root_requires_address() {
        let mut server = RemoteServer::new("ci", "http://h").with_token_root_support(true);
        server.address = None;
        assert!(matches!(
            build_trigger_url("app", "t", &[], false, &ctx(server)),
            Err(TriggerError::Configuration(_))
        ));
    }

    #[test]
    fn absolute_job_url_keeps_its_base() {
        let c = ctx(RemoteServer::new("ci", "http://h"));
        assert_eq!(
            build_trigger_url("https://o/job/x", "", &[], false, &c).unwrap(),
            "https://o/job/x/build?delay=0"
        );
    }

    #[test]
    fn crumb_url_encodes_xpath() {
        let c = ctx(RemoteServer::new("ci", "http://h/"));
        assert_eq!(
            crumb_issuer_url(&c).unwrap(),
            "http://h/crumbIssuer/api/xml?xpath=concat%28%2F%2FcrumbRequestField%2C%22%3A%22%2C%2F%2Fcrumb%29"
        );
    }
}
