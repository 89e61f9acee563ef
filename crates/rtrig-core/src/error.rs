//! Error taxonomy for remote calls.
//!
//! Every URL stored in an error has already been passed through
//! [`crate::url_model::url_without_parameters`], so formatting an error never
//! leaks the security token or trigger parameters.

use crate::transport::TransportError;

/// Error returned by the request engine.
#[derive(Debug, thiserror::Error)]
pub enum TriggerError {
    /// Missing or invalid server address or job identifier.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Remote answered 401.
    #[error("unauthorized (401): {url}")]
    Unauthorized { url: String },

    /// Remote answered 403.
    #[error("forbidden (403): {url}")]
    Forbidden { url: String },

    /// Remote answered 404 on a non-crumb endpoint.
    #[error("not found (404): {url}")]
    NotFound { url: String },

    /// Unexpected response from the crumb issuer.
    #[error("unexpected response from {url} (HTTP {status}): {message}")]
    Protocol {
        url: String,
        status: u32,
        message: String,
    },

    /// Transport-level failure; eligible for retry.
    #[error("connection to {url} failed: {source}")]
    Transient {
        url: String,
        #[source]
        source: TransportError,
    },

    /// Transient failures continued past the configured retry limit.
    #[error("retry limit exceeded after {attempts} attempt(s) to {url}")]
    RetryLimitExceeded {
        url: String,
        attempts: u32,
        #[source]
        last: Box<TriggerError>,
    },

    /// A blocking wait was interrupted.
    #[error("call cancelled while waiting to retry")]
    Cancelled,

    /// Reading a local file parameter failed.
    #[error("reading file parameter {name:?}: {source}")]
    Io {
        name: String,
        #[source]
        source: std::io::Error,
    },
}

impl TriggerError {
    /// True for the single retry-eligible variant.
    pub fn is_transient(&self) -> bool {
        matches!(self, TriggerError::Transient { .. })
    }

    /// HTTP status associated with the error, if any.
    pub fn status(&self) -> Option<u32> {
        match self {
            TriggerError::Unauthorized { .. } => Some(401),
            TriggerError::Forbidden { .. } => Some(403),
            TriggerError::NotFound { .. } => Some(404),
            TriggerError::Protocol { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub(crate) fn missing_address() -> Self {
        TriggerError::Configuration(
            "the remote server address can not be empty, or it must be overridden on the job configuration"
                .to_string(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::TransportErrorKind;

    #[test]
    fn only_transport_failures_are_transient() {
        let transient = TriggerError::Transient {
            url: "http://h/job/a/build".to_string(),
            source: TransportError::new(TransportErrorKind::Timeout, "timed out"),
        };
        assert!(transient.is_transient());
        assert!(!TriggerError::Cancelled.is_transient());
        assert!(!TriggerError::NotFound {
            url: "http://h".to_string()
        }
        .is_transient());
    }

    #[test]
    fn status_codes_for_classified_errors() {
        let url = "http://h".to_string();
        assert_eq!(TriggerError::Unauthorized { url: url.clone() }.status(), Some(401));
        assert_eq!(TriggerError::Forbidden { url: url.clone() }.status(), Some(403));
        assert_eq!(TriggerError::NotFound { url }.status(), Some(404));
        assert_eq!(TriggerError::Cancelled.status(), None);
    }
}
