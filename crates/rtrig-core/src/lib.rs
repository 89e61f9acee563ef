//! Client library for triggering jobs on a remote build server.
//!
//! A call flows caller → [`gate`] → [`retry`] → [`executor`] →
//! [`transport`], with [`crumb`], [`url_model`] and [`form`] filling in the
//! request. [`client::RemoteClient`] wires these together.

pub mod config;
pub mod logging;

pub mod auth;
pub mod client;
pub mod context;
pub mod control;
pub mod crumb;
pub mod error;
pub mod executor;
pub mod form;
pub mod gate;
pub mod macros;
pub mod response;
pub mod retry;
pub mod transport;
pub mod url_model;

pub use auth::{Auth, AuthCapability};
pub use client::{CallOptions, RemoteClient};
pub use context::{CallContext, LogSink, RemoteServer, TracingSink};
pub use control::CancelToken;
pub use error::TriggerError;
pub use form::{PostParams, PostValue};
pub use gate::PermitPool;
pub use response::ConnectionResponse;
