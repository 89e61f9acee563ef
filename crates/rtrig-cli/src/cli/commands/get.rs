//! `rtrig get <url>` – GET a URL on the server and print the response.

use anyhow::{Context, Result};
use rtrig_core::config::RtrigConfig;
use rtrig_core::url_model::is_absolute_url;

use super::{client_for, context_for, interrupt_token, options_for};

/// Absolute URLs pass through; anything else is a path on `address`.
fn resolve_url(address: Option<&str>, url: &str) -> Result<String> {
    if is_absolute_url(url) {
        return Ok(url.to_string());
    }
    let address = address.context("server has no address to resolve a relative URL against")?;
    Ok(format!(
        "{}/{}",
        address.trim_end_matches('/'),
        url.trim_start_matches('/')
    ))
}

pub fn run_get(cfg: &RtrigConfig, url: &str, server: Option<&str>, raw: bool) -> Result<()> {
    let client = client_for(cfg);
    let ctx = context_for(cfg, server)?;
    let url = resolve_url(ctx.server.address(), url)?;
    let cancel = interrupt_token();
    let opts = options_for(cfg, &cancel);

    if raw {
        println!("{}", client.get_raw(&url, &ctx, &opts)?);
        return Ok(());
    }
    let resp = client.get(&url, &ctx, &opts)?;
    match &resp.body {
        Some(body) => println!("{}", serde_json::to_string_pretty(body)?),
        None => println!("{}", resp.raw_body),
    }
    Ok(())
}
