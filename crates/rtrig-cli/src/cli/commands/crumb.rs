//! `rtrig crumb` – fetch the server's CSRF crumb.

use anyhow::Result;
use rtrig_core::config::RtrigConfig;

use super::{client_for, context_for, interrupt_token, options_for};

pub fn run_crumb(cfg: &RtrigConfig, server: Option<&str>, no_cache: bool) -> Result<()> {
    let client = client_for(cfg);
    let ctx = context_for(cfg, server)?;
    let cancel = interrupt_token();
    let mut opts = options_for(cfg, &cancel);
    if no_cache {
        opts.crumb_cache_enabled = false;
    }
    let crumb = client.crumb(&ctx, &opts)?;
    if crumb.is_enabled() {
        println!("{}: {}", crumb.header_name(), crumb.value());
    } else {
        println!("crumb protection disabled");
    }
    Ok(())
}
