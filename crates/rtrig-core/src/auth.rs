//! Authentication capability.
//!
//! The engine only needs one thing from an authentication method: write an
//! authorization header onto an outbound request. Which method applies is a
//! pure function of the call's override and the server default.

use std::fmt;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use serde::{Deserialize, Serialize};

use crate::context::{CallContext, RemoteServer};
use crate::error::TriggerError;
use crate::transport::RequestBuilder;

/// Applies an authorization header to an outbound request.
pub trait AuthCapability: fmt::Debug + Send + Sync {
    fn apply(&self, request: &mut RequestBuilder, ctx: &CallContext) -> Result<(), TriggerError>;

    /// True for the no-op method; an override that is a no-op does not
    /// replace the server default.
    fn is_none(&self) -> bool {
        false
    }
}

/// Built-in authentication methods, as stored in config.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Auth {
    /// No authorization header.
    #[default]
    None,
    /// User name plus API token, sent as HTTP Basic.
    Token { user: String, api_token: String },
    /// Opaque bearer token.
    Bearer { token: String },
}

impl fmt::Debug for Auth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Auth::None => f.write_str("Auth::None"),
            Auth::Token { user, .. } => {
                write!(f, "Auth::Token {{ user: {user:?}, api_token: <redacted> }}")
            }
            Auth::Bearer { .. } => f.write_str("Auth::Bearer { token: <redacted> }"),
        }
    }
}

impl AuthCapability for Auth {
    fn apply(&self, request: &mut RequestBuilder, _ctx: &CallContext) -> Result<(), TriggerError> {
        match self {
            Auth::None => {}
            Auth::Token { user, api_token } => {
                let encoded = STANDARD.encode(format!("{user}:{api_token}"));
                request.set_header("Authorization", format!("Basic {encoded}"));
            }
            Auth::Bearer { token } => {
                request.set_header("Authorization", format!("Bearer {token}"));
            }
        }
        Ok(())
    }

    fn is_none(&self) -> bool {
        matches!(self, Auth::None)
    }
}

/// Where the effective authentication came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthSource {
    None,
    Override,
    PerServer,
}

/// Pick the authentication for a call: a non-no-op override wins, then the
/// server default, then nothing.
pub fn resolve_auth<'a>(
    override_auth: Option<&'a dyn AuthCapability>,
    server: &'a RemoteServer,
) -> (AuthSource, Option<&'a dyn AuthCapability>) {
    if let Some(auth) = override_auth.filter(|a| !a.is_none()) {
        return (AuthSource::Override, Some(auth));
    }
    if !server.auth.is_none() {
        return (AuthSource::PerServer, Some(server.auth.as_ref()));
    }
    (AuthSource::None, None)
}
