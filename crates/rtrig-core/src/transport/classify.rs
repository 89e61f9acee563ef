//! Classify curl errors into transport error kinds.

use super::TransportErrorKind;

/// Classify a curl error for diagnostics and request validation.
pub fn classify_curl_error(e: &curl::Error) -> TransportErrorKind {
    if e.is_operation_timedout() {
        return TransportErrorKind::Timeout;
    }
    if e.is_couldnt_connect()
        || e.is_couldnt_resolve_host()
        || e.is_couldnt_resolve_proxy()
        || e.is_read_error()
        || e.is_recv_error()
        || e.is_send_error()
        || e.is_got_nothing()
        || e.is_partial_file()
    {
        return TransportErrorKind::Connection;
    }
    if e.is_url_malformed() || e.is_unsupported_protocol() {
        return TransportErrorKind::InvalidRequest;
    }
    TransportErrorKind::Other
}
