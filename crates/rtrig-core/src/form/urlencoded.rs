//! `application/x-www-form-urlencoded` bodies.

use super::{PostParams, PostValue};
use crate::url_model::{encode_pair, join_query};

/// `k1=v1&k2=v2` with keys and values percent-encoded. File values have no
/// urlencoded form; callers route those through multipart instead.
pub fn build_urlencoded(params: &PostParams) -> String {
    join_query(params.iter().filter_map(|(k, v)| match v {
        PostValue::Text(text) => Some(encode_pair(k, text)),
        PostValue::File(_) => None,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pairs_are_encoded_and_joined() {
        let mut params = PostParams::new();
        params.insert("b".to_string(), "x&y".into());
        params.insert("a key".to_string(), "1+1".into());
        assert_eq!(build_urlencoded(&params), "a%20key=1%2B1&b=x%26y");
    }

    #[test]
    fn empty_params_give_empty_body() {
        assert_eq!(build_urlencoded(&PostParams::new()), "");
    }
}
