//! CLI command handlers. Each command is in its own file.

mod crumb;
mod get;
mod job_url;
mod servers;
mod trigger;

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use rtrig_core::config::RtrigConfig;
use rtrig_core::crumb::CrumbCache;
use rtrig_core::{CallContext, CallOptions, CancelToken, LogSink, RemoteClient, TracingSink};
use signal_hook::consts::{SIGINT, SIGTERM};
use signal_hook::iterator::Signals;

pub use crumb::run_crumb;
pub use get::run_get;
pub use job_url::run_job_url;
pub use servers::run_servers;
pub use trigger::{run_trigger, TriggerArgs};

/// Console lines go to stderr and the log file; stdout carries results only.
struct ConsoleSink;

impl LogSink for ConsoleSink {
    fn line(&self, message: &str) {
        eprintln!("{message}");
        TracingSink.line(message);
    }
}

fn client_for(cfg: &RtrigConfig) -> RemoteClient {
    let crumbs = Arc::new(CrumbCache::new(Duration::from_secs(cfg.crumb.ttl_secs)));
    RemoteClient::curl()
        .with_crumb_cache(crumbs)
        .with_proxy(cfg.proxy.clone())
}

fn context_for(cfg: &RtrigConfig, server: Option<&str>) -> Result<CallContext> {
    let server = cfg.server(server)?.to_remote_server();
    Ok(CallContext::new(server, Arc::new(ConsoleSink)))
}

fn options_for<'a>(cfg: &RtrigConfig, cancel: &'a CancelToken) -> CallOptions<'a> {
    let policy = cfg.retry.policy();
    CallOptions {
        poll_interval: policy.poll_interval,
        retry_limit: policy.retry_limit,
        override_auth: None,
        crumb_cache_enabled: cfg.crumb.cache_enabled,
        cancel: Some(cancel),
    }
}

/// Token cancelled by the first SIGINT or SIGTERM. A pending retry sleep or
/// permit wait ends at once; an attempt already on the wire runs to its
/// timeout. A second signal exits immediately.
fn interrupt_token() -> CancelToken {
    let token = CancelToken::new();
    let mut signals = match Signals::new([SIGINT, SIGTERM]) {
        Ok(signals) => signals,
        Err(e) => {
            tracing::warn!("cannot install signal handler, calls are not cancellable: {}", e);
            return token;
        }
    };
    let remote = token.clone();
    let spawned = std::thread::Builder::new()
        .name("rtrig-signals".to_string())
        .spawn(move || {
            for signal in signals.forever() {
                if remote.is_cancelled() {
                    std::process::exit(128 + signal);
                }
                tracing::info!(signal, "interrupted, cancelling pending calls");
                eprintln!("Interrupted, cancelling (press Ctrl-C again to abort)");
                remote.cancel();
            }
        });
    if let Err(e) = spawned {
        tracing::warn!("cannot start signal thread, calls are not cancellable: {}", e);
    }
    token
}
