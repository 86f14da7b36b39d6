//! Per-request customization: composable, fallible request options.
//!
//! A [`RequestOption`] is a small closure that mutates the in-flight
//! [`PendingRequest`] (headers and query) before anything touches the
//! network. Options are applied in order and fail fast: the first one that
//! errors aborts the call with zero transport invocations.
//!
//! Header-setting options overwrite earlier values for the same key; query
//! options are additive, each `(key, value)` pair joining whatever is
//! already there, with the full query re-encoded deterministically (sorted
//! by key).

use std::sync::Arc;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use http::header::CONTENT_TYPE;
use http::{HeaderMap, HeaderName, HeaderValue, Method};
use url::Url;

use crate::{Error, Result};

/// The mutable working copy of a request while options are applied.
///
/// Built fresh for every call from the client's defaults plus per-call
/// options; the result is reused unchanged for every retry attempt.
#[derive(Debug, Clone)]
pub struct PendingRequest {
    method: Method,
    url: Url,
    headers: HeaderMap,
}

impl PendingRequest {
    pub(crate) fn new(method: Method, url: Url) -> Self {
        Self {
            method,
            url,
            headers: HeaderMap::new(),
        }
    }

    /// The HTTP method of the call.
    pub fn method(&self) -> &Method {
        &self.method
    }

    /// The target URL, including any query added so far.
    pub fn url(&self) -> &Url {
        &self.url
    }

    /// The headers accumulated so far.
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Sets a header, replacing any existing value for the same key.
    pub fn set_header(&mut self, key: &str, value: &str) -> Result<()> {
        let name = HeaderName::try_from(key)
            .map_err(|e| Error::OptionApply(format!("invalid header name {key:?}: {e}")))?;
        let value = HeaderValue::try_from(value)
            .map_err(|e| Error::OptionApply(format!("invalid header value for {key:?}: {e}")))?;
        self.headers.insert(name, value);
        Ok(())
    }

    /// Adds one query pair, keeping existing values for the same key.
    ///
    /// The whole query string is re-encoded sorted by key, so repeated
    /// application from the same starting state yields the same URL.
    pub fn add_query(&mut self, key: &str, value: &str) {
        let mut pairs: Vec<(String, String)> = self
            .url
            .query_pairs()
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();
        pairs.push((key.to_owned(), value.to_owned()));
        // Stable sort: duplicate keys keep their insertion order.
        pairs.sort_by(|a, b| a.0.cmp(&b.0));

        let mut editor = self.url.query_pairs_mut();
        editor.clear();
        editor.extend_pairs(pairs.iter().map(|(k, v)| (k.as_str(), v.as_str())));
        drop(editor);
    }
}

/// A composable, order-sensitive request mutation.
///
/// Cheap to clone; the same option can be registered as a client default and
/// reused across calls.
///
/// # Examples
///
/// ```
/// use sturdyhttp::options::{set_header, set_query, RequestOption};
///
/// let opts: Vec<RequestOption> = vec![
///     set_header("x-request-source", "batch-job"),
///     set_query("page", "1"),
/// ];
/// ```
#[derive(Clone)]
pub struct RequestOption {
    apply: Arc<dyn Fn(&mut PendingRequest) -> Result<()> + Send + Sync>,
}

impl RequestOption {
    /// Wraps an arbitrary mutation as an option.
    pub fn new<F>(apply: F) -> Self
    where
        F: Fn(&mut PendingRequest) -> Result<()> + Send + Sync + 'static,
    {
        Self {
            apply: Arc::new(apply),
        }
    }

    pub(crate) fn apply(&self, request: &mut PendingRequest) -> Result<()> {
        (self.apply)(request)
    }
}

impl std::fmt::Debug for RequestOption {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("RequestOption")
    }
}

/// Sets a request header. Overwrite semantics: a later option with the same
/// key replaces the value, it does not append.
pub fn set_header(key: impl Into<String>, value: impl Into<String>) -> RequestOption {
    let key = key.into();
    let value = value.into();
    RequestOption::new(move |req| req.set_header(&key, &value))
}

/// Sets the Content-Type to `application/json; charset=UTF-8`.
pub fn set_type_json() -> RequestOption {
    set_header(CONTENT_TYPE.as_str(), "application/json; charset=UTF-8")
}

/// Sets the Content-Type to `application/xml; charset=UTF-8`.
pub fn set_type_xml() -> RequestOption {
    set_header(CONTENT_TYPE.as_str(), "application/xml; charset=UTF-8")
}

/// Sets the Content-Type to `application/x-www-form-urlencoded`.
pub fn set_type_form() -> RequestOption {
    set_header(CONTENT_TYPE.as_str(), "application/x-www-form-urlencoded")
}

/// Adds one query parameter. Additive semantics: existing values for the
/// same key are kept.
pub fn set_query(key: impl Into<String>, value: impl Into<String>) -> RequestOption {
    let key = key.into();
    let value = value.into();
    RequestOption::new(move |req| {
        req.add_query(&key, &value);
        Ok(())
    })
}

/// Adds a batch of query parameters, in order, all additive.
pub fn set_query_pairs<I, K, V>(pairs: I) -> RequestOption
where
    I: IntoIterator<Item = (K, V)>,
    K: Into<String>,
    V: Into<String>,
{
    let pairs: Vec<(String, String)> = pairs
        .into_iter()
        .map(|(k, v)| (k.into(), v.into()))
        .collect();
    RequestOption::new(move |req| {
        for (key, value) in &pairs {
            req.add_query(key, value);
        }
        Ok(())
    })
}

/// Injects an `Authorization: Bearer <token>` header.
pub fn bearer_auth(token: impl Into<String>) -> RequestOption {
    set_header("authorization", format!("Bearer {}", token.into()))
}

/// Injects an `Authorization: Basic <credentials>` header.
pub fn basic_auth(user: impl Into<String>, password: impl Into<String>) -> RequestOption {
    let credentials = STANDARD.encode(format!("{}:{}", user.into(), password.into()));
    set_header("authorization", format!("Basic {credentials}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pending(url: &str) -> PendingRequest {
        PendingRequest::new(Method::GET, Url::parse(url).unwrap())
    }

    #[test]
    fn options_apply_in_order_and_headers_overwrite() {
        let mut req = pending("http://example.com/");
        for opt in [set_header("x-tag", "first"), set_header("x-tag", "second")] {
            opt.apply(&mut req).unwrap();
        }
        assert_eq!(req.headers().get("x-tag").unwrap(), "second");
        assert_eq!(req.headers().len(), 1);
    }

    #[test]
    fn query_is_additive_not_overwriting() {
        let mut req = pending("http://example.com/");
        for opt in [set_query("a", "1"), set_query("a", "2")] {
            opt.apply(&mut req).unwrap();
        }
        let query = req.url().query().unwrap();
        assert!(query.contains("a=1"));
        assert!(query.contains("a=2"));
    }

    #[test]
    fn query_encoding_is_sorted_by_key() {
        let mut req = pending("http://example.com/?z=26");
        for opt in [set_query("a", "1"), set_query("m", "13")] {
            opt.apply(&mut req).unwrap();
        }
        assert_eq!(req.url().query(), Some("a=1&m=13&z=26"));
    }

    #[test]
    fn query_pairs_batch_preserves_duplicate_order() {
        let mut req = pending("http://example.com/");
        set_query_pairs([("k", "x"), ("k", "y")])
            .apply(&mut req)
            .unwrap();
        assert_eq!(req.url().query(), Some("k=x&k=y"));
    }

    #[test]
    fn invalid_header_value_fails_fast() {
        let mut req = pending("http://example.com/");
        let err = set_header("x-bad", "line\nbreak").apply(&mut req).unwrap_err();
        assert!(matches!(err, Error::OptionApply(_)));
    }

    #[test]
    fn content_type_helpers_use_fixed_mime_strings() {
        let mut req = pending("http://example.com/");
        set_type_json().apply(&mut req).unwrap();
        assert_eq!(
            req.headers().get(CONTENT_TYPE).unwrap(),
            "application/json; charset=UTF-8"
        );
        set_type_form().apply(&mut req).unwrap();
        assert_eq!(
            req.headers().get(CONTENT_TYPE).unwrap(),
            "application/x-www-form-urlencoded"
        );
    }

    #[test]
    fn bearer_auth_sets_authorization_header() {
        let mut req = pending("http://example.com/");
        bearer_auth("tok123").apply(&mut req).unwrap();
        assert_eq!(req.headers().get("authorization").unwrap(), "Bearer tok123");
    }

    #[test]
    fn basic_auth_encodes_credentials() {
        let mut req = pending("http://example.com/");
        basic_auth("aladdin", "opensesame").apply(&mut req).unwrap();
        assert_eq!(
            req.headers().get("authorization").unwrap(),
            "Basic YWxhZGRpbjpvcGVuc2VzYW1l"
        );
    }
}
