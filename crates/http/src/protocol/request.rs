//! The head of an incoming request: method, target, version and headers.

use http::header::{CONNECTION, CONTENT_TYPE};
use http::request::Parts;
use http::{HeaderMap, HeaderValue, Method, Request, Uri, Version};

/// An HTTP request header.
///
/// Wraps a `http::Request<()>` so the body can be attached later with [`RequestHeader::body`].
/// Header lookups through [`RequestHeader::headers`] are case-insensitive.
#[derive(Debug)]
pub struct RequestHeader {
    inner: Request<()>,
}

impl AsRef<Request<()>> for RequestHeader {
    fn as_ref(&self) -> &Request<()> {
        &self.inner
    }
}

impl AsMut<Request<()>> for RequestHeader {
    fn as_mut(&mut self) -> &mut Request<()> {
        &mut self.inner
    }
}

impl RequestHeader {
    pub fn into_inner(self) -> Request<()> {
        self.inner
    }

    /// Attaches a body, producing the full request handed to handlers.
    pub fn body<T>(self, body: T) -> Request<T> {
        self.inner.map(|_| body)
    }

    pub fn method(&self) -> &Method {
        self.inner.method()
    }

    pub fn uri(&self) -> &Uri {
        self.inner.uri()
    }

    pub fn path(&self) -> &str {
        self.inner.uri().path()
    }

    pub fn query(&self) -> Option<&str> {
        self.inner.uri().query()
    }

    pub fn version(&self) -> Version {
        self.inner.version()
    }

    pub fn headers(&self) -> &HeaderMap {
        self.inner.headers()
    }

    pub fn content_type(&self) -> Option<&HeaderValue> {
        self.inner.headers().get(CONTENT_TYPE)
    }

    /// Whether the connection should stay open after this request's response.
    ///
    /// HTTP/1.1 defaults to keep-alive unless `Connection: close` is sent,
    /// HTTP/1.0 only keeps the connection with an explicit `Connection: keep-alive`.
    pub fn is_keep_alive(&self) -> bool {
        let has_token = |token: &str| {
            self.headers()
                .get_all(CONNECTION)
                .iter()
                .filter_map(|value| value.to_str().ok())
                .flat_map(|value| value.split(','))
                .any(|item| item.trim().eq_ignore_ascii_case(token))
        };

        match self.version() {
            Version::HTTP_11 => !has_token("close"),
            _ => has_token("keep-alive"),
        }
    }
}

impl From<Parts> for RequestHeader {
    #[inline]
    fn from(parts: Parts) -> Self {
        Self { inner: Request::from_parts(parts, ()) }
    }
}

impl From<Request<()>> for RequestHeader {
    #[inline]
    fn from(inner: Request<()>) -> Self {
        Self { inner }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header(method: Method, version: Version, connection: Option<&str>) -> RequestHeader {
        let mut builder = Request::builder().method(method).uri("/user/1?name=John").version(version);
        if let Some(value) = connection {
            builder = builder.header(CONNECTION, value);
        }
        builder.body(()).unwrap().into()
    }

    #[test]
    fn path_and_query() {
        let header = header(Method::GET, Version::HTTP_11, None);
        assert_eq!(header.path(), "/user/1");
        assert_eq!(header.query(), Some("name=John"));
        assert_eq!(header.method(), &Method::GET);
    }

    #[test]
    fn keep_alive_rules() {
        assert!(header(Method::POST, Version::HTTP_11, None).is_keep_alive());
        assert!(!header(Method::POST, Version::HTTP_11, Some("Close")).is_keep_alive());
        assert!(!header(Method::POST, Version::HTTP_10, None).is_keep_alive());
        assert!(header(Method::POST, Version::HTTP_10, Some("keep-alive")).is_keep_alive());
    }

    #[test]
    fn content_type_is_case_insensitive() {
        let header: RequestHeader =
            Request::builder().method(Method::POST).header("content-TYPE", "application/json").body(()).unwrap().into();
        assert_eq!(header.content_type(), Some(&HeaderValue::from_static("application/json")));
    }
}
