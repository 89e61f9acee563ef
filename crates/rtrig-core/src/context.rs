//! Per-call context: the effective remote server and where user-facing lines go.

use std::path::PathBuf;
use std::sync::{Arc, Mutex, PoisonError};

use crate::auth::{Auth, AuthCapability};

/// A remote build server as seen by one call. Immutable for the call's lifetime.
#[derive(Debug, Clone)]
pub struct RemoteServer {
    /// Display name (config key); never sent over the wire.
    pub name: String,
    /// Base address, e.g. `https://ci.example.com`. `None` means not configured.
    pub address: Option<String>,
    /// Route requests through the configured or environment proxy.
    pub use_proxy: bool,
    /// Server accepts `/buildByToken/...` triggers.
    pub token_root_support: bool,
    /// Default authentication for this server.
    pub auth: Arc<dyn AuthCapability>,
}

impl RemoteServer {
    pub fn new(name: impl Into<String>, address: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            address: Some(address.into()),
            use_proxy: false,
            token_root_support: false,
            auth: Arc::new(Auth::None),
        }
    }

    pub fn with_auth(mut self, auth: impl AuthCapability + 'static) -> Self {
        self.auth = Arc::new(auth);
        self
    }

    pub fn with_token_root_support(mut self, enabled: bool) -> Self {
        self.token_root_support = enabled;
        self
    }

    pub fn with_proxy(mut self, enabled: bool) -> Self {
        self.use_proxy = enabled;
        self
    }

    /// Address with surrounding whitespace trimmed, or `None` when blank.
    pub fn address(&self) -> Option<&str> {
        self.address
            .as_deref()
            .map(str::trim)
            .filter(|a| !a.is_empty())
    }
}

/// Receives plain progress lines for the caller's console.
pub trait LogSink: Send + Sync {
    fn line(&self, message: &str);
}

/// Forwards lines to `tracing` at info level.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl LogSink for TracingSink {
    fn line(&self, message: &str) {
        tracing::info!(target: "rtrig::console", "{}", message);
    }
}

/// Buffers lines in memory; handy for tests and for callers that render later.
#[derive(Debug, Default)]
pub struct MemorySink {
    lines: Mutex<Vec<String>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lines(&self) -> Vec<String> {
        self.lines
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn contains(&self, needle: &str) -> bool {
        self.lines().iter().any(|l| l.contains(needle))
    }
}

impl LogSink for MemorySink {
    fn line(&self, message: &str) {
        self.lines
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(message.to_string());
    }
}

/// Everything one trigger invocation needs besides its arguments.
#[derive(Clone)]
pub struct CallContext {
    pub server: RemoteServer,
    pub log: Arc<dyn LogSink>,
    /// Identifier of the local run on whose behalf the call is made.
    pub run_id: Option<String>,
    /// Workspace of that run, for collaborators that resolve files or macros.
    pub workspace: Option<PathBuf>,
}

impl CallContext {
    pub fn new(server: RemoteServer, log: Arc<dyn LogSink>) -> Self {
        Self {
            server,
            log,
            run_id: None,
            workspace: None,
        }
    }

    pub fn with_run(mut self, run_id: impl Into<String>, workspace: impl Into<PathBuf>) -> Self {
        self.run_id = Some(run_id.into());
        self.workspace = Some(workspace.into());
        self
    }

    pub fn log(&self, message: &str) {
        self.log.line(message);
    }
}

impl std::fmt::Debug for CallContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CallContext")
            .field("server", &self.server)
            .field("run_id", &self.run_id)
            .field("workspace", &self.workspace)
            .finish_non_exhaustive()
    }
}
