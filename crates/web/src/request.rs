//! What a handler can see of a request besides its body.
//!
//! - `RequestContext`: the request head, the matched path parameters, the query parameters
//!   and the body options in effect
//! - `PathParams`: named path segments bound by the route that matched
//! - `QueryParams`: the decoded query string

use crate::body::BodyConfig;
use http::{HeaderMap, Method, Uri, Version};
use ingest_http::protocol::RequestHeader;
use matchit::Params;
use std::collections::HashMap;
use tracing::warn;

/// The context of a request while it is dispatched to its handler.
#[derive(Debug, Clone, Copy)]
pub struct RequestContext<'req> {
    request_header: &'req RequestHeader,
    path_params: &'req PathParams,
    query_params: &'req QueryParams,
    body_config: &'req BodyConfig,
}

impl<'req> RequestContext<'req> {
    pub fn new(
        request_header: &'req RequestHeader,
        path_params: &'req PathParams,
        query_params: &'req QueryParams,
        body_config: &'req BodyConfig,
    ) -> Self {
        Self { request_header, path_params, query_params, body_config }
    }

    pub fn request_header(&self) -> &'req RequestHeader {
        self.request_header
    }

    pub fn method(&self) -> &'req Method {
        self.request_header.method()
    }

    pub fn uri(&self) -> &'req Uri {
        self.request_header.uri()
    }

    pub fn path(&self) -> &'req str {
        self.request_header.path()
    }

    pub fn version(&self) -> Version {
        self.request_header.version()
    }

    /// Header names are matched case-insensitively.
    pub fn headers(&self) -> &'req HeaderMap {
        self.request_header.headers()
    }

    pub fn path_params(&self) -> &'req PathParams {
        self.path_params
    }

    pub fn query_params(&self) -> &'req QueryParams {
        self.query_params
    }

    pub fn body_config(&self) -> &'req BodyConfig {
        self.body_config
    }
}

/// Named path segments bound when a route pattern matched, e.g. `id` for `/user/:id`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PathParams {
    params: Vec<(String, String)>,
}

impl PathParams {
    #[inline]
    pub fn empty() -> Self {
        Self::default()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.params.len()
    }

    /// Gets the value bound to `key`, `None` if the pattern has no such segment.
    pub fn get(&self, key: impl AsRef<str>) -> Option<&str> {
        let key = key.as_ref();
        self.params.iter().find(|(name, _)| name == key).map(|(_, value)| value.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.params.iter().map(|(name, value)| (name.as_str(), value.as_str()))
    }
}

impl From<Params<'_, '_>> for PathParams {
    fn from(params: Params<'_, '_>) -> Self {
        Self { params: params.iter().map(|(name, value)| (name.to_string(), value.to_string())).collect() }
    }
}

/// The query string of a request as a string-to-string map.
///
/// Parsed on its own, independent of routing, so it is there for every request. A key
/// given more than once keeps its last value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryParams {
    params: HashMap<String, String>,
}

impl QueryParams {
    /// ```
    /// use http::Uri;
    /// use ingest_web::QueryParams;
    ///
    /// let uri: Uri = "/search?q=rust+http&page=2".parse().unwrap();
    /// let query = QueryParams::parse(&uri);
    /// assert_eq!(query.get("q"), Some("rust http"));
    /// assert_eq!(query.get("page"), Some("2"));
    /// ```
    pub fn parse(uri: &Uri) -> Self {
        let Some(query) = uri.query() else {
            return Self::default();
        };

        match serde_urlencoded::from_str::<Vec<(String, String)>>(query) {
            Ok(pairs) => Self { params: pairs.into_iter().collect() },
            Err(e) => {
                warn!(cause = %e, query, "ignore malformed query string");
                Self::default()
            }
        }
    }

    pub fn get(&self, key: impl AsRef<str>) -> Option<&str> {
        self.params.get(key.as_ref()).map(String::as_str)
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.params.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.params.iter().map(|(name, value)| (name.as_str(), value.as_str()))
    }
}
