//! `rtrig servers` – list configured servers.

use rtrig_core::auth::Auth;
use rtrig_core::config::RtrigConfig;

fn auth_kind(auth: &Auth) -> &'static str {
    match auth {
        Auth::None => "none",
        Auth::Token { .. } => "token",
        Auth::Bearer { .. } => "bearer",
    }
}

pub fn run_servers(cfg: &RtrigConfig) {
    if cfg.servers.is_empty() {
        println!("No servers configured.");
        return;
    }
    println!("{:<16} {:<8} {:<6} {:<10} {}", "NAME", "AUTH", "PROXY", "TOKEN-ROOT", "ADDRESS");
    for s in &cfg.servers {
        println!(
            "{:<16} {:<8} {:<6} {:<10} {}",
            s.name,
            auth_kind(&s.auth),
            s.use_proxy,
            s.token_root_support,
            s.address
        );
    }
}
