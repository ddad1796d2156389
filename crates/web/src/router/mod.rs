//! Method + path routing.
//!
//! Routes are kept in registration order. [`Router::at`] returns the first route whose
//! filter accepts the request and whose pattern matches the path, binding the named
//! segments of the pattern into [`PathParams`].
//!
//! Patterns are matched with `matchit`; both `{id}` and Express-style `:id` segments
//! name a parameter.
//!
//! ```
//! use http::Request;
//! use ingest_http::protocol::RequestHeader;
//! use ingest_web::handler_fn;
//! use ingest_web::router::{RouteResult, Router, get};
//!
//! async fn user() -> &'static str {
//!     "user"
//! }
//!
//! let router = Router::builder().route("/user/:id", get(handler_fn(user))).build().unwrap();
//!
//! let header = RequestHeader::from(Request::get("/user/123").body(()).unwrap());
//! let RouteResult::Found { params, .. } = router.at(&header) else {
//!     panic!("expect a route");
//! };
//! assert_eq!(params.get("id"), Some("123"));
//! ```

pub mod filter;

use crate::PathParams;
use crate::handler::RequestHandler;
use filter::{AllFilter, Filter};
use ingest_http::protocol::RequestHeader;
use thiserror::Error;
use tracing::{debug, trace};

type RouterFilter = dyn Filter + Send + Sync + 'static;

/// The routing table of a server, read-only once built.
#[derive(Debug)]
pub struct Router {
    routes: Vec<Route>,
}

#[derive(Debug)]
struct Route {
    pattern: String,
    matcher: matchit::Router<()>,
    item: RouterItem,
}

/// A route's filter and the handler it dispatches to.
pub struct RouterItem {
    filter: Box<RouterFilter>,
    handler: Box<dyn RequestHandler>,
}

/// The outcome of routing a request.
#[derive(Debug)]
pub enum RouteResult<'router> {
    Found { item: &'router RouterItem, params: PathParams },
    NotFound,
}

impl Router {
    pub fn builder() -> RouterBuilder {
        RouterBuilder::new()
    }

    /// Finds the first route, in registration order, accepting this request.
    pub fn at(&self, header: &RequestHeader) -> RouteResult<'_> {
        let path = header.path();

        for route in &self.routes {
            if !route.item.filter.matches(header) {
                continue;
            }

            if let Ok(matched) = route.matcher.at(path) {
                trace!(pattern = %route.pattern, path, "route matched");
                return RouteResult::Found { item: &route.item, params: matched.params.into() };
            }
        }

        debug!(method = %header.method(), path, "no route matched");
        RouteResult::NotFound
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}

impl RouterItem {
    pub fn filter(&self) -> &RouterFilter {
        self.filter.as_ref()
    }

    pub fn handler(&self) -> &dyn RequestHandler {
        self.handler.as_ref()
    }
}

impl std::fmt::Debug for RouterItem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RouterItem").finish_non_exhaustive()
    }
}

impl RouteResult<'_> {
    #[inline]
    pub fn is_found(&self) -> bool {
        matches!(self, RouteResult::Found { .. })
    }
}

#[derive(Error, Debug)]
pub enum RouterBuildError {
    #[error("invalid route pattern '{pattern}': {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: matchit::InsertError,
    },
}

#[derive(Debug, Default)]
pub struct RouterBuilder {
    routes: Vec<(String, RouterItemBuilder)>,
}

impl RouterBuilder {
    fn new() -> Self {
        Self::default()
    }

    pub fn route(mut self, pattern: impl Into<String>, item_builder: RouterItemBuilder) -> Self {
        self.routes.push((pattern.into(), item_builder));
        self
    }

    pub fn build(self) -> Result<Router, RouterBuildError> {
        let mut routes = Vec::with_capacity(self.routes.len());

        for (pattern, item_builder) in self.routes {
            let mut matcher = matchit::Router::new();
            matcher
                .insert(normalize_pattern(&pattern), ())
                .map_err(|source| RouterBuildError::InvalidPattern { pattern: pattern.clone(), source })?;

            routes.push(Route { pattern, matcher, item: item_builder.build() });
        }

        Ok(Router { routes })
    }
}

/// Rewrites Express-style `:name` segments to the `{name}` syntax of `matchit`.
fn normalize_pattern(pattern: &str) -> String {
    pattern
        .split('/')
        .map(|segment| match segment.strip_prefix(':') {
            Some(name) if !name.is_empty() => format!("{{{name}}}"),
            _ => segment.to_string(),
        })
        .collect::<Vec<_>>()
        .join("/")
}

macro_rules! method_router_filter {
    ($method:ident, $method_name:ident) => {
        #[doc = concat!("Routes `", stringify!($method), "` requests to `handler`.")]
        pub fn $method<H: RequestHandler + 'static>(handler: H) -> RouterItemBuilder {
            let mut filters = filter::all_filter();
            filters.and(filter::$method_name());
            RouterItemBuilder { filters, handler: Box::new(handler) }
        }
    };
}

method_router_filter!(get, get_method);
method_router_filter!(post, post_method);
method_router_filter!(put, put_method);
method_router_filter!(delete, delete_method);
method_router_filter!(head, head_method);
method_router_filter!(options, options_method);
method_router_filter!(connect, connect_method);
method_router_filter!(patch, patch_method);
method_router_filter!(trace, trace_method);

/// Routes requests of every method to `handler`.
pub fn any<H: RequestHandler + 'static>(handler: H) -> RouterItemBuilder {
    RouterItemBuilder { filters: filter::all_filter(), handler: Box::new(handler) }
}

pub struct RouterItemBuilder {
    filters: AllFilter,
    handler: Box<dyn RequestHandler>,
}

impl RouterItemBuilder {
    /// Adds a filter the request must also pass.
    pub fn with<F: Filter + Send + Sync + 'static>(mut self, filter: F) -> Self {
        self.filters.and(filter);
        self
    }

    fn build(self) -> RouterItem {
        RouterItem { filter: Box::new(self.filters), handler: self.handler }
    }
}

impl std::fmt::Debug for RouterItemBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RouterItemBuilder").field("filters", &self.filters).finish_non_exhaustive()
    }
}
