use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::auth::Auth;
use crate::context::RemoteServer;
use crate::retry::RetryPolicy;

/// Retry policy parameters (optional section in config.toml).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Seconds to wait between attempts.
    pub poll_interval_secs: u64,
    /// Retries after the first attempt (0 = single attempt).
    pub retry_limit: u32,
}

impl Default for RetryConfig {
    fn default() -> Self {
        let policy = RetryPolicy::default();
        Self {
            poll_interval_secs: policy.poll_interval.as_secs(),
            retry_limit: policy.retry_limit,
        }
    }
}

impl RetryConfig {
    pub fn policy(&self) -> RetryPolicy {
        RetryPolicy::new(Duration::from_secs(self.poll_interval_secs), self.retry_limit)
    }
}

/// Crumb caching (optional section in config.toml).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CrumbConfig {
    pub cache_enabled: bool,
    /// Lifetime of a cached crumb in seconds.
    pub ttl_secs: u64,
}

impl Default for CrumbConfig {
    fn default() -> Self {
        Self {
            cache_enabled: true,
            ttl_secs: crate::crumb::DEFAULT_CRUMB_TTL.as_secs(),
        }
    }
}

/// One remote build server (`[[servers]]`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerConfig {
    pub name: String,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub use_proxy: bool,
    /// Trigger through `/buildByToken` instead of the job's own path.
    #[serde(default)]
    pub token_root_support: bool,
    #[serde(default)]
    pub auth: Auth,
}

impl ServerConfig {
    pub fn to_remote_server(&self) -> RemoteServer {
        RemoteServer::new(self.name.clone(), self.address.clone())
            .with_proxy(self.use_proxy)
            .with_token_root_support(self.token_root_support)
            .with_auth(self.auth.clone())
    }
}

/// Global configuration loaded from `~/.config/rtrig/config.toml`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RtrigConfig {
    /// Cap on simultaneous POSTs from this process (None = ungated).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_concurrent_calls: Option<usize>,
    /// Proxy URL for servers with `use_proxy`; the environment's proxy applies when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub proxy: Option<String>,
    #[serde(default)]
    pub retry: RetryConfig,
    #[serde(default)]
    pub crumb: CrumbConfig,
    #[serde(default)]
    pub servers: Vec<ServerConfig>,
}

impl RtrigConfig {
    /// Server by name; with `None`, the only configured server.
    pub fn server(&self, name: Option<&str>) -> Result<&ServerConfig> {
        match name {
            Some(name) => self
                .servers
                .iter()
                .find(|s| s.name == name)
                .with_context(|| format!("no server named {name:?} in config")),
            None => match self.servers.as_slice() {
                [only] => Ok(only),
                [] => bail!("no servers configured; add a [[servers]] entry to the config"),
                _ => bail!("several servers configured; pick one with --server"),
            },
        }
    }
}

pub fn config_path() -> Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("rtrig")?;
    Ok(xdg_dirs.place_config_file("config.toml")?)
}

/// Load configuration from disk, creating a default file if none exists.
pub fn load_or_init() -> Result<RtrigConfig> {
    let path = config_path()?;
    if !path.exists() {
        let default_cfg = RtrigConfig::default();
        let toml = toml::to_string_pretty(&default_cfg)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, toml)?;
        tracing::info!("created default config at {}", path.display());
        return Ok(default_cfg);
    }
    load_from(&path)
}

/// Load configuration from an explicit path.
pub fn load_from(path: &Path) -> Result<RtrigConfig> {
    let data = fs::read_to_string(path)
        .with_context(|| format!("reading config {}", path.display()))?;
    let cfg: RtrigConfig =
        toml::from_str(&data).with_context(|| format!("parsing config {}", path.display()))?;
    Ok(cfg)
}
