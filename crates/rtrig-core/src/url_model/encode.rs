//! Percent-encoding for path segments, query keys and query values.

use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};

/// Everything except ASCII alphanumerics and `. - * _` is escaped. Spaces
/// become `%20`, never `+`.
const VALUE: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'.')
    .remove(b'-')
    .remove(b'*')
    .remove(b'_');

/// Percent-encode the UTF-8 bytes of `s`.
pub fn encode_value(s: &str) -> String {
    utf8_percent_encode(s, VALUE).to_string()
}

/// Encode key and value independently and join them with `=`.
pub fn encode_pair(key: &str, value: &str) -> String {
    format!("{}={}", encode_value(key), encode_value(value))
}

/// Join query segments with `&`, skipping empty ones.
pub fn join_query<I, S>(segments: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut out = String::new();
    for seg in segments {
        let seg = seg.as_ref();
        if seg.is_empty() {
            continue;
        }
        if !out.is_empty() {
            out.push('&');
        }
        out.push_str(seg);
    }
    out
}
