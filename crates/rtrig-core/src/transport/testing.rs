//! Scripted transports for unit tests.

use std::sync::Mutex;

use super::{HttpRequest, RawResponse, Transport, TransportError, TransportErrorKind};

type Responder = dyn Fn(&HttpRequest, usize) -> Result<RawResponse, TransportError> + Send + Sync;

/// Answers each request with a closure and records everything it was sent.
///
/// The closure receives the request and the zero-based index of the call.
pub(crate) struct ScriptedTransport {
    respond: Box<Responder>,
    seen: Mutex<Vec<HttpRequest>>,
}

impl ScriptedTransport {
    pub(crate) fn new<F>(respond: F) -> Self
    where
        F: Fn(&HttpRequest, usize) -> Result<RawResponse, TransportError> + Send + Sync + 'static,
    {
        Self {
            respond: Box::new(respond),
            seen: Mutex::new(Vec::new()),
        }
    }

    /// Crumb issuer answers 404; every other request gets `status` and `body`.
    pub(crate) fn no_crumb(status: u32, body: &'static str) -> Self {
        Self::new(move |req, _| {
            if req.url.contains("/crumbIssuer/") {
                Ok(RawResponse::new(404))
            } else {
                Ok(RawResponse::new(status).with_body(body))
            }
        })
    }

    pub(crate) fn requests(&self) -> Vec<HttpRequest> {
        self.seen.lock().unwrap().clone()
    }

    pub(crate) fn calls_to(&self, needle: &str) -> usize {
        self.seen
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.url.contains(needle))
            .count()
    }
}

impl Transport for ScriptedTransport {
    fn execute(&self, request: &HttpRequest) -> Result<RawResponse, TransportError> {
        let index = {
            let mut seen = self.seen.lock().unwrap();
            seen.push(request.clone());
            seen.len() - 1
        };
        (self.respond)(request, index)
    }
}

pub(crate) fn refused() -> TransportError {
    TransportError::new(TransportErrorKind::Connection, "connection refused")
}
