use std::fmt;

use crate::error::TriggerError;

/// Key used to index cached crumbs.
///
/// URLs are normalised down to `(scheme, host, port)` so every endpoint on the
/// same origin shares one crumb, and no crumb crosses to another origin.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct HostKey {
    pub scheme: String,
    pub host: String,
    pub port: u16,
}

impl HostKey {
    /// Construct a host key from a URL string.
    pub fn from_url(url: &str) -> Result<Self, TriggerError> {
        let parsed = url::Url::parse(url).map_err(|e| {
            TriggerError::Configuration(format!(
                "invalid server URL {}: {e}",
                crate::url_model::url_without_parameters(url)
            ))
        })?;

        let scheme = parsed.scheme().to_string();
        let host = parsed
            .host_str()
            .ok_or_else(|| TriggerError::Configuration(format!("URL missing host: {scheme}://")))?
            .to_ascii_lowercase();
        let port = parsed.port_or_known_default().ok_or_else(|| {
            TriggerError::Configuration(format!("URL missing port and unknown default: {host}"))
        })?;

        Ok(Self { scheme, host, port })
    }
}

impl fmt::Display for HostKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}://{}:{}", self.scheme, self.host, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn host_key_from_url_parses_scheme_host_port() {
        let key = HostKey::from_url("https://ci.example.com:8443/crumbIssuer/api/xml").unwrap();
        assert_eq!(key.scheme, "https");
        assert_eq!(key.host, "ci.example.com");
        assert_eq!(key.port, 8443);
    }

    #[test]
    fn host_key_uses_default_port_when_missing() {
        let key = HostKey::from_url("http://CI.example.com/path").unwrap();
        assert_eq!(key.host, "ci.example.com");
        // HTTP default port
        assert_eq!(key.port, 80);
        assert_eq!(key.to_string(), "http://ci.example.com:80");
    }

    #[test]
    fn different_ports_are_different_hosts() {
        let a = HostKey::from_url("http://h:8080/").unwrap();
        let b = HostKey::from_url("http://h:8081/").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn garbage_is_configuration_error() {
        assert!(matches!(
            HostKey::from_url("not a url"),
            Err(TriggerError::Configuration(_))
        ));
    }
}
