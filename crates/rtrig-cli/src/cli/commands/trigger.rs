//! `rtrig trigger <job>...` – trigger builds of remote jobs.

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};
use rtrig_core::config::RtrigConfig;
use rtrig_core::form::LocalFile;
use rtrig_core::macros::VariableExpander;
use rtrig_core::{
    CallContext, CallOptions, ConnectionResponse, PermitPool, PostParams, PostValue, RemoteClient,
};

use super::{client_for, context_for, interrupt_token, options_for};

#[derive(Debug, Clone, Default)]
pub struct TriggerArgs {
    pub jobs: Vec<String>,
    pub server: Option<String>,
    pub token: String,
    pub params: Vec<(String, String)>,
    pub files: Vec<(String, String)>,
    pub parameterized: bool,
    pub retry_limit: Option<u32>,
    pub poll_interval: Option<u64>,
    pub expand_env: bool,
}

/// Text and file parameters merged into one map; a file wins over a text
/// value with the same key.
fn post_params(args: &TriggerArgs) -> PostParams {
    let mut params: PostParams = args
        .params
        .iter()
        .map(|(k, v)| (k.clone(), PostValue::from(v.as_str())))
        .collect();
    for (key, path) in &args.files {
        params.insert(key.clone(), PostValue::file(LocalFile::new(path)));
    }
    params
}

/// Triggers every job on its own thread. With a pool, at most `max` triggers
/// hold a permit at once. Results come back in job order.
fn trigger_all(
    client: &RemoteClient,
    ctx: &CallContext,
    args: &TriggerArgs,
    opts: &CallOptions<'_>,
    pool: Option<&PermitPool>,
) -> Vec<Result<ConnectionResponse>> {
    let params = post_params(args);
    let params = &params;
    thread::scope(|s| {
        let handles: Vec<_> = args
            .jobs
            .iter()
            .map(|job| {
                s.spawn(move || {
                    client
                        .trigger(job, &args.token, params, args.parameterized, ctx, opts, pool)
                        .with_context(|| format!("triggering {job}"))
                })
            })
            .collect();
        handles
            .into_iter()
            .map(|h| h.join().unwrap_or_else(|_| Err(anyhow!("trigger thread panicked"))))
            .collect()
    })
}

pub fn run_trigger(cfg: &RtrigConfig, args: &TriggerArgs) -> Result<()> {
    let mut client = client_for(cfg);
    let mut ctx = context_for(cfg, args.server.as_deref())?;
    if args.expand_env {
        let cwd = std::env::current_dir().context("resolving working directory")?;
        let run_id = std::env::var("BUILD_TAG").unwrap_or_else(|_| "rtrig-cli".to_string());
        ctx = ctx.with_run(run_id, cwd);
        client = client.with_macro_expander(Arc::new(VariableExpander::from_env()));
    }

    let cancel = interrupt_token();
    let mut opts = options_for(cfg, &cancel);
    if let Some(limit) = args.retry_limit {
        opts.retry_limit = limit;
    }
    if let Some(secs) = args.poll_interval {
        opts.poll_interval = Duration::from_secs(secs);
    }
    let pool = cfg.max_concurrent_calls.map(PermitPool::new);

    let outcomes = trigger_all(&client, &ctx, args, &opts, pool.as_ref());
    let mut failed = 0;
    for (job, outcome) in args.jobs.iter().zip(outcomes) {
        match outcome {
            Ok(resp) => {
                println!("Triggered {} (HTTP {})", job, resp.status);
                if let Some(location) = resp.location() {
                    println!("Queue item: {location}");
                }
            }
            Err(e) => {
                failed += 1;
                eprintln!("rtrig error: {e:#}");
            }
        }
    }
    if failed > 0 {
        bail!("{} of {} trigger(s) failed", failed, args.jobs.len());
    }
    Ok(())
}
