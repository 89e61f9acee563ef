//! Response contract handed back to callers.

use serde_json::{Map, Value};

use crate::transport::HeaderMap;

/// Result of one successful exchange.
#[derive(Debug, Clone, Default)]
pub struct ConnectionResponse {
    pub status: u32,
    /// Multi-valued headers, names lower-cased.
    pub headers: HeaderMap,
    /// Parsed JSON object; present only for status < 400 and a JSON body.
    pub body: Option<Map<String, Value>>,
    /// Trimmed response text as received.
    pub raw_body: String,
}

impl ConnectionResponse {
    /// First value of a response header (case-insensitive).
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .and_then(|v| v.first())
            .map(String::as_str)
    }

    /// `Location` header, e.g. the queue item of a triggered build.
    pub fn location(&self) -> Option<&str> {
        self.header("location")
    }
}

/// Cheap shape check before attempting a parse: `null`, `{...}` or `[...]`.
pub fn may_be_json(text: &str) -> bool {
    let t = text.trim();
    t == "null" || (t.starts_with('{') && t.ends_with('}')) || (t.starts_with('[') && t.ends_with(']'))
}

/// Parse `text` as a JSON object. Arrays, scalars and malformed input give `None`.
pub fn parse_json_object(text: &str) -> Option<Map<String, Value>> {
    match serde_json::from_str::<Value>(text) {
        Ok(Value::Object(map)) => Some(map),
        Ok(_) => None,
        Err(e) => {
            tracing::debug!("response looked like JSON but did not parse: {}", e);
            None
        }
    }
}
