//! Composable request filters deciding whether a route applies to a request.
//!
//! Every route carries a filter; the method helpers of [`crate::router`] install a
//! method filter, and [`RouterItemBuilder::with`](crate::router::RouterItemBuilder::with)
//! adds more. Filters only see the request head, never the body.
//!
//! # Examples
//!
//! ```
//! use ingest_web::router::filter::{all_filter, any_filter, get_method, head_method, header};
//!
//! // GET or HEAD
//! let mut read_only = any_filter();
//! read_only.or(get_method()).or(head_method());
//!
//! // and an api token
//! let mut combined = all_filter();
//! combined.and(read_only).and(header("X-Api-Token", "secret"));
//! ```

use http::{HeaderName, HeaderValue, Method};
use ingest_http::protocol::RequestHeader;
use tracing::error;

/// Decides whether a request head matches.
pub trait Filter: Send + Sync {
    fn matches(&self, req: &RequestHeader) -> bool;
}

/// A filter that wraps a closure.
struct FnFilter<F: Fn(&RequestHeader) -> bool>(F);

impl<F: Fn(&RequestHeader) -> bool + Send + Sync> Filter for FnFilter<F> {
    fn matches(&self, req: &RequestHeader) -> bool {
        (self.0)(req)
    }
}

/// Creates a new filter from a closure.
///
/// ```
/// use ingest_web::router::filter::fn_filter;
///
/// let api_only = fn_filter(|req| req.path().starts_with("/api"));
/// ```
pub fn fn_filter<F>(f: F) -> impl Filter
where
    F: Fn(&RequestHeader) -> bool + Send + Sync,
{
    FnFilter(f)
}

/// Creates a new OR-composed filter chain.
pub fn any_filter() -> AnyFilter {
    AnyFilter::new()
}

/// Compose filters with OR logic; an empty chain matches everything.
#[derive(Default)]
pub struct AnyFilter {
    filters: Vec<Box<dyn Filter>>,
}

impl AnyFilter {
    fn new() -> Self {
        Self { filters: vec![] }
    }

    pub fn or<F: Filter + 'static>(&mut self, filter: F) -> &mut Self {
        self.filters.push(Box::new(filter));
        self
    }
}

impl Filter for AnyFilter {
    fn matches(&self, req: &RequestHeader) -> bool {
        self.filters.is_empty() || self.filters.iter().any(|filter| filter.matches(req))
    }
}

impl std::fmt::Debug for AnyFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnyFilter").field("filters", &self.filters.len()).finish()
    }
}

/// Creates a new AND-composed filter chain.
pub fn all_filter() -> AllFilter {
    AllFilter::new()
}

/// Compose filters with AND logic; an empty chain matches everything.
#[derive(Default)]
pub struct AllFilter {
    filters: Vec<Box<dyn Filter>>,
}

impl AllFilter {
    fn new() -> Self {
        Self { filters: vec![] }
    }

    pub fn and<F: Filter + 'static>(&mut self, filter: F) -> &mut Self {
        self.filters.push(Box::new(filter));
        self
    }
}

impl Filter for AllFilter {
    fn matches(&self, req: &RequestHeader) -> bool {
        self.filters.iter().all(|filter| filter.matches(req))
    }
}

impl std::fmt::Debug for AllFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AllFilter").field("filters", &self.filters.len()).finish()
    }
}

/// Matches one HTTP method exactly; a `GET` filter does not match `HEAD`.
#[derive(Debug, Clone)]
pub struct MethodFilter(Method);

impl Filter for MethodFilter {
    fn matches(&self, req: &RequestHeader) -> bool {
        self.0.eq(req.method())
    }
}

/// Creates a filter for an arbitrary method.
pub fn method(method: Method) -> MethodFilter {
    MethodFilter(method)
}

macro_rules! method_filter {
    ($method:ident, $upper_case_method:ident) => {
        #[doc = concat!("Creates a filter that matches HTTP ", stringify!($upper_case_method), " requests.")]
        #[inline]
        pub fn $method() -> MethodFilter {
            MethodFilter(Method::$upper_case_method)
        }
    };
}

method_filter!(get_method, GET);
method_filter!(post_method, POST);
method_filter!(put_method, PUT);
method_filter!(delete_method, DELETE);
method_filter!(head_method, HEAD);
method_filter!(options_method, OPTIONS);
method_filter!(connect_method, CONNECT);
method_filter!(patch_method, PATCH);
method_filter!(trace_method, TRACE);

/// Matches requests carrying a header with exactly this value.
///
/// An invalid header name or value gives a filter that never matches.
pub fn header<K, V>(header_name: K, header_value: V) -> HeaderFilter
where
    HeaderName: TryFrom<K>,
    <HeaderName as TryFrom<K>>::Error: std::fmt::Display,
    HeaderValue: TryFrom<V>,
    <HeaderValue as TryFrom<V>>::Error: std::fmt::Display,
{
    let name = HeaderName::try_from(header_name).map_err(|e| error!(cause = %e, "invalid header name in filter"));
    let value = HeaderValue::try_from(header_value).map_err(|e| error!(cause = %e, "invalid header value in filter"));

    match (name, value) {
        (Ok(name), Ok(value)) => HeaderFilter(Some((name, value))),
        _ => HeaderFilter(None),
    }
}

/// A filter that matches HTTP headers.
#[derive(Debug, Clone)]
pub struct HeaderFilter(Option<(HeaderName, HeaderValue)>);

impl Filter for HeaderFilter {
    fn matches(&self, req: &RequestHeader) -> bool {
        let Some((name, value)) = &self.0 else {
            return false;
        };
        req.headers().get_all(name).iter().any(|v| v == value)
    }
}
