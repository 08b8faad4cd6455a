//! Incoming HTTP request type.

use std::collections::HashMap;

use bytes::Bytes;
use http::uri::InvalidUri;
use http::{HeaderMap, HeaderName, HeaderValue, Uri};

use crate::form::{Form, FormError};

/// An incoming HTTP request with its body already collected.
pub struct Request {
    pub(crate) method: http::Method,
    pub(crate) uri: Uri,
    pub(crate) headers: HeaderMap,
    pub(crate) body: Bytes,
    pub(crate) params: HashMap<String, String>,
}

impl Request {
    pub(crate) fn new(method: http::Method, uri: Uri, headers: HeaderMap, body: Bytes) -> Self {
        Self { method, uri, headers, body, params: HashMap::new() }
    }

    /// Builder for requests constructed in-process, e.g. to drive
    /// [`Routes::dispatch`](crate::Routes::dispatch) from tests.
    ///
    /// ```rust
    /// use chainmux::Request;
    ///
    /// let req = Request::builder(http::Method::POST, "/form")?
    ///     .header(http::header::CONTENT_TYPE, "application/x-www-form-urlencoded")
    ///     .body("name=Ana");
    /// assert_eq!(req.path(), "/form");
    /// # Ok::<(), http::uri::InvalidUri>(())
    /// ```
    ///
    /// Fails if `uri` is not a valid request target.
    pub fn builder(method: http::Method, uri: &str) -> Result<RequestBuilder, InvalidUri> {
        Ok(RequestBuilder { method, uri: uri.parse()?, headers: HeaderMap::new() })
    }

    pub fn method(&self) -> &http::Method { &self.method }
    pub fn uri(&self) -> &Uri { &self.uri }
    pub fn path(&self) -> &str { self.uri.path() }
    pub fn query(&self) -> Option<&str> { self.uri.query() }
    pub fn headers(&self) -> &HeaderMap { &self.headers }
    pub fn body(&self) -> &[u8] { &self.body }

    /// Header lookup. Returns `None` for absent headers and for values that
    /// are not visible ASCII.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Returns a named path parameter.
    ///
    /// For a route `/users/{id}`, `req.param("id")` on `/users/42` returns `Some("42")`.
    pub fn param(&self, key: &str) -> Option<&str> {
        self.params.get(key).map(String::as_str)
    }

    /// Parses the URL-encoded form carried by the query string and, for
    /// POST, PUT and PATCH, the body. See [`Form`].
    pub fn form(&self) -> Result<Form, FormError> {
        Form::parse(self)
    }
}

/// Fluent builder for [`Request`]. Obtain via [`Request::builder`].
pub struct RequestBuilder {
    method: http::Method,
    uri: Uri,
    headers: HeaderMap,
}

impl RequestBuilder {
    /// Appends a header. Values that are not valid header text are skipped.
    pub fn header(mut self, name: HeaderName, value: &str) -> Self {
        if let Ok(value) = HeaderValue::from_str(value) {
            self.headers.append(name, value);
        }
        self
    }

    pub fn body(self, body: impl Into<Bytes>) -> Request {
        Request::new(self.method, self.uri, self.headers, body.into())
    }

    pub fn empty(self) -> Request {
        self.body(Bytes::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_rejects_unparseable_targets() {
        assert!(Request::builder(http::Method::GET, "/he llo").is_err());
        assert!(Request::builder(http::Method::GET, "").is_err());
    }

    #[test]
    fn builder_keeps_path_query_and_headers() {
        let req = Request::builder(http::Method::GET, "/search?q=rust")
            .unwrap()
            .header(http::header::AUTHORIZATION, "secret")
            .header(http::header::ACCEPT, "bad\nvalue")
            .empty();
        assert_eq!(req.path(), "/search");
        assert_eq!(req.query(), Some("q=rust"));
        assert_eq!(req.header("authorization"), Some("secret"));
        assert_eq!(req.header("accept"), None);
        assert!(req.body().is_empty());
    }
}
