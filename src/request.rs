//! Incoming HTTP request type.

use std::collections::HashMap;

use bytes::Bytes;
use serde_json::Value;
use thiserror::Error;

use crate::method::Method;

/// The request body claimed to be JSON but is not usable as one.
#[derive(Debug, Error)]
pub enum BodyError {
    #[error("malformed JSON body: {0}")]
    Syntax(#[from] serde_json::Error),

    /// Only objects and arrays are accepted at the top level.
    #[error("JSON body must be an object or an array, got {0}")]
    NotStructured(Value),
}

/// An incoming HTTP request with its body fully buffered.
pub struct Request {
    pub(crate) method: Method,
    pub(crate) path: String,
    pub(crate) headers: Vec<(String, String)>,
    pub(crate) body: Bytes,
    pub(crate) params: HashMap<String, String>,
}

impl Request {
    pub(crate) fn new(
        method: Method,
        path: String,
        headers: Vec<(String, String)>,
        body: Bytes,
        params: HashMap<String, String>,
    ) -> Self {
        Self { method, path, headers, body, params }
    }

    pub fn method(&self) -> Method { self.method }
    pub fn path(&self) -> &str { &self.path }
    pub fn headers(&self) -> &[(String, String)] { &self.headers }
    pub fn body(&self) -> &[u8] { &self.body }

    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Returns a named path parameter.
    ///
    /// For a route `/posts/{postId}`, `req.param("postId")` on `/posts/42` returns `Some("42")`.
    pub fn param(&self, key: &str) -> Option<&str> {
        self.params.get(key).map(String::as_str)
    }

    /// The body as loosely-typed JSON.
    ///
    /// Bodies are only parsed when the request declares a JSON content type.
    /// Any other content type, or an empty body, yields an empty object so
    /// handlers always see a map. Beyond JSON syntax the only check is that
    /// the top-level value is an object or an array.
    pub fn json_body(&self) -> Result<Value, BodyError> {
        if !self.is_json() || self.body.is_empty() {
            return Ok(Value::Object(Default::default()));
        }
        match serde_json::from_slice::<Value>(&self.body)? {
            value @ (Value::Object(_) | Value::Array(_)) => Ok(value),
            scalar => Err(BodyError::NotStructured(scalar)),
        }
    }

    fn is_json(&self) -> bool {
        let Some(content_type) = self.header("content-type") else {
            return false;
        };
        let essence = content_type
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase();
        essence == "application/json" || essence.ends_with("+json")
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn request(content_type: Option<&str>, body: &'static str) -> Request {
        let headers = content_type
            .map(|ct| vec![("Content-Type".to_owned(), ct.to_owned())])
            .unwrap_or_default();
        Request::new(Method::Post, "/posts".into(), headers, Bytes::from_static(body.as_bytes()), HashMap::new())
    }

    #[test]
    fn parses_json_bodies_verbatim() {
        let req = request(Some("application/json; charset=utf-8"), r#"{"title":"A","extra":[1,2]}"#);
        assert_eq!(req.json_body().unwrap(), json!({"title": "A", "extra": [1, 2]}));
    }

    #[test]
    fn accepts_structured_json_suffix() {
        let req = request(Some("application/merge-patch+json"), r#"{"body":"B"}"#);
        assert_eq!(req.json_body().unwrap(), json!({"body": "B"}));
    }

    #[test]
    fn non_json_content_type_yields_empty_object() {
        let req = request(Some("text/plain"), r#"{"title":"A"}"#);
        assert_eq!(req.json_body().unwrap(), json!({}));

        let req = request(None, r#"{"title":"A"}"#);
        assert_eq!(req.json_body().unwrap(), json!({}));
    }

    #[test]
    fn empty_json_body_yields_empty_object() {
        let req = request(Some("application/json"), "");
        assert_eq!(req.json_body().unwrap(), json!({}));
    }

    #[test]
    fn malformed_json_is_an_error() {
        let req = request(Some("application/json"), r#"{"title":"#);
        assert!(matches!(req.json_body(), Err(BodyError::Syntax(_))));
    }

    #[test]
    fn top_level_scalars_are_rejected() {
        for body in [r#""x""#, "42", "true", "null"] {
            let req = request(Some("application/json"), body);
            assert!(matches!(req.json_body(), Err(BodyError::NotStructured(_))), "accepted {body}");
        }
    }

    #[test]
    fn top_level_arrays_are_accepted() {
        let req = request(Some("application/json"), r#"[{"title":"A"}]"#);
        assert_eq!(req.json_body().unwrap(), json!([{"title": "A"}]));
    }

    #[test]
    fn header_lookup_ignores_case() {
        let req = request(Some("application/json"), "");
        assert_eq!(req.header("content-type"), Some("application/json"));
    }
}
