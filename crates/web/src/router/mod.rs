//! Method and path routing over an ordered, frozen route table.
//!
//! Patterns are split on `/` into literal segments and `:name` captures. Routes are
//! tested in registration order and the first match wins, so more specific patterns
//! should be registered first.
//!
//! ```
//! use bytes::Bytes;
//! use http::{Method, Response};
//! use tinyhttp_web::router::{get, post, Router};
//! use tinyhttp_web::{handler_fn, RequestContext};
//!
//! async fn user(ctx: RequestContext) -> Result<Response<Bytes>, tinyhttp::protocol::BoxError> {
//!     Ok(Response::new(Bytes::from(format!("user {}\n", ctx.path_var("id").unwrap_or("?")))))
//! }
//!
//! let router = Router::builder()
//!     .route("/users/:id", get(handler_fn(user)))
//!     .route("/users", post(handler_fn(user)))
//!     .build();
//!
//! let matched = router.resolve(&Method::GET, "/users/42").unwrap();
//! assert_eq!(matched.captures().get("id"), Some("42"));
//! assert!(router.resolve(&Method::GET, "/users/42/profile").is_none());
//! ```

use std::fmt;

use http::Method;
use tinyhttp::protocol::pct_decode;

use crate::handler::RouteHandler;
use crate::request::PathVars;

/// The method side of a route.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteMethod {
    Exact(Method),
    /// Wildcard; only ever answers `OPTIONS`.
    Any,
}

impl RouteMethod {
    fn accepts(&self, method: &Method) -> bool {
        match self {
            Self::Exact(registered) => registered == method || (method == Method::HEAD && registered == Method::GET),
            Self::Any => method == Method::OPTIONS,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Capture(String),
}

fn split_pattern(pattern: &str) -> Vec<Segment> {
    pattern
        .split('/')
        .filter(|s| !s.is_empty())
        .map(|s| match s.strip_prefix(':') {
            Some(name) => Segment::Capture(name.to_owned()),
            None => Segment::Literal(s.to_owned()),
        })
        .collect()
}

fn split_path(path: &str) -> Vec<String> {
    path.split('/').filter(|s| !s.is_empty()).map(|s| pct_decode(s).unwrap_or_else(|_| s.to_owned())).collect()
}

/// One registered route.
pub struct Route {
    method: RouteMethod,
    pattern: String,
    segments: Vec<Segment>,
    handler: Box<dyn RouteHandler>,
}

impl fmt::Debug for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Route").field("method", &self.method).field("pattern", &self.pattern).finish_non_exhaustive()
    }
}

impl Route {
    pub fn method(&self) -> &RouteMethod {
        &self.method
    }

    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// Compares segment counts and literals, ignoring the method.
    fn captures(&self, segments: &[String]) -> Option<PathVars> {
        if self.segments.len() != segments.len() {
            return None;
        }

        let mut captures = PathVars::default();
        for (pattern, got) in self.segments.iter().zip(segments) {
            match pattern {
                Segment::Capture(name) => captures.insert(name.clone(), got.clone()),
                Segment::Literal(literal) if literal == got => {}
                Segment::Literal(_) => return None,
            }
        }
        Some(captures)
    }
}

/// The result of [`Router::resolve`].
#[derive(Debug)]
pub struct RouteMatch<'router> {
    route: &'router Route,
    captures: PathVars,
}

impl<'router> RouteMatch<'router> {
    pub fn handler(&self) -> &'router dyn RouteHandler {
        self.route.handler.as_ref()
    }

    pub fn route(&self) -> &'router Route {
        self.route
    }

    pub fn captures(&self) -> &PathVars {
        &self.captures
    }

    pub fn into_captures(self) -> PathVars {
        self.captures
    }
}

/// The frozen route table.
///
/// A `Router` can't be changed once built; share it behind an `Arc` for lock-free
/// lookups from every worker.
#[derive(Debug)]
pub struct Router {
    routes: Vec<Route>,
}

impl Router {
    pub fn builder() -> RouterBuilder {
        RouterBuilder::new()
    }

    pub fn routes(&self) -> &[Route] {
        &self.routes
    }

    /// Finds the first route, in registration order, that accepts `method` on `path`.
    ///
    /// `HEAD` is answered by a `GET` route, and a wildcard route answers `OPTIONS`.
    pub fn resolve(&self, method: &Method, path: &str) -> Option<RouteMatch<'_>> {
        let segments = split_path(path);
        self.routes
            .iter()
            .filter(|route| route.method.accepts(method))
            .find_map(|route| route.captures(&segments).map(|captures| RouteMatch { route, captures }))
    }

    /// Every method registered for a pattern matching `path`, plus the implied ones.
    ///
    /// `HEAD` is added when `GET` is present and `OPTIONS` is always last, so the
    /// result is never empty.
    pub fn allowed_methods(&self, path: &str) -> Vec<Method> {
        let segments = split_path(path);
        let routes = self.routes.iter().filter(|route| route.captures(&segments).is_some());
        with_implied_methods(routes)
    }

    /// Whether any pattern matches `path`, whatever its method.
    pub fn matches_path(&self, path: &str) -> bool {
        let segments = split_path(path);
        self.routes.iter().any(|route| route.captures(&segments).is_some())
    }

    /// Every method registered anywhere in the table, for `OPTIONS *`.
    pub fn server_methods(&self) -> Vec<Method> {
        with_implied_methods(self.routes.iter())
    }
}

fn with_implied_methods<'a>(routes: impl Iterator<Item = &'a Route>) -> Vec<Method> {
    let mut methods: Vec<Method> = Vec::new();
    for route in routes {
        if let RouteMethod::Exact(method) = &route.method
            && !methods.contains(method)
        {
            methods.push(method.clone());
        }
    }

    if methods.contains(&Method::GET) && !methods.contains(&Method::HEAD) {
        methods.push(Method::HEAD);
    }
    if !methods.contains(&Method::OPTIONS) {
        methods.push(Method::OPTIONS);
    }
    methods
}

/// Renders methods as an `Allow` header value.
pub fn allow_header(methods: &[Method]) -> String {
    methods.iter().map(Method::as_str).collect::<Vec<_>>().join(",")
}

#[derive(Debug, Default)]
pub struct RouterBuilder {
    routes: Vec<Route>,
}

impl RouterBuilder {
    fn new() -> Self {
        Self::default()
    }

    pub fn route(mut self, pattern: impl Into<String>, item_builder: RouteItemBuilder) -> Self {
        let pattern = pattern.into();
        let segments = split_pattern(&pattern);
        self.routes.push(Route { method: item_builder.method, pattern, segments, handler: item_builder.handler });
        self
    }

    /// Freezes the table.
    pub fn build(self) -> Router {
        Router { routes: self.routes }
    }
}

/// A handler paired with the method it answers, waiting for a pattern.
pub struct RouteItemBuilder {
    method: RouteMethod,
    handler: Box<dyn RouteHandler>,
}

impl fmt::Debug for RouteItemBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RouteItemBuilder").field("method", &self.method).finish_non_exhaustive()
    }
}

macro_rules! method_route {
    ($method:ident, $upper_case_method:ident) => {
        #[doc = concat!("Routes HTTP ", stringify!($upper_case_method), " requests to `handler`.")]
        pub fn $method<H: RouteHandler + 'static>(handler: H) -> RouteItemBuilder {
            RouteItemBuilder { method: RouteMethod::Exact(Method::$upper_case_method), handler: Box::new(handler) }
        }
    };
}

method_route!(get, GET);
method_route!(post, POST);
method_route!(put, PUT);
method_route!(delete, DELETE);
method_route!(head, HEAD);
method_route!(options, OPTIONS);
method_route!(patch, PATCH);

/// Routes `OPTIONS` requests on the pattern to `handler`, whatever they ask for.
pub fn any<H: RouteHandler + 'static>(handler: H) -> RouteItemBuilder {
    RouteItemBuilder { method: RouteMethod::Any, handler: Box::new(handler) }
}

#[cfg(test)]
mod tests {
    use bytes::Bytes;
    use http::{Method, Response};
    use tinyhttp::protocol::BoxError;

    use super::{Router, allow_header, any, get, post, put};
    use crate::handler::handler_fn;
    use crate::request::RequestContext;

    async fn ok(_ctx: RequestContext) -> Result<Response<Bytes>, BoxError> {
        Ok(Response::new(Bytes::from_static(b"ok")))
    }

    fn router() -> Router {
        Router::builder()
            .route("/users/:id", get(handler_fn(ok)))
            .route("/users", post(handler_fn(ok)))
            .route("/users/:id/posts/:post", get(handler_fn(ok)))
            .route("/files/readme", put(handler_fn(ok)))
            .route("/files/:name", get(handler_fn(ok)))
            .route("/cors", any(handler_fn(ok)))
            .build()
    }

    #[test]
    fn capture_segment() {
        let router = router();
        let matched = router.resolve(&Method::GET, "/users/42").unwrap();

        assert_eq!(matched.route().pattern(), "/users/:id");
        assert_eq!(matched.captures().get("id"), Some("42"));
        assert_eq!(matched.captures().len(), 1);
    }

    #[test]
    fn segment_count_must_match() {
        let router = router();

        assert!(router.resolve(&Method::GET, "/users/42/profile").is_none());
        assert!(router.resolve(&Method::GET, "/users").is_none());
        assert!(router.resolve(&Method::GET, "/").is_none());
    }

    #[test]
    fn multiple_captures() {
        let router = router();
        let matched = router.resolve(&Method::GET, "/users/7/posts/hello").unwrap();

        assert_eq!(matched.captures().get("id"), Some("7"));
        assert_eq!(matched.captures().get("post"), Some("hello"));
    }

    #[test]
    fn captures_are_decoded() {
        let router = router();
        let matched = router.resolve(&Method::GET, "/users/john%20doe").unwrap();

        assert_eq!(matched.captures().get("id"), Some("john doe"));
    }

    #[test]
    fn repeated_slashes_are_ignored() {
        let router = router();
        assert!(router.resolve(&Method::GET, "//users///42/").is_some());
    }

    #[test]
    fn head_falls_back_to_get() {
        let router = router();
        let matched = router.resolve(&Method::HEAD, "/users/1").unwrap();

        assert_eq!(matched.route().pattern(), "/users/:id");
        assert!(router.resolve(&Method::HEAD, "/users").is_none());
    }

    #[test]
    fn registration_order_wins() {
        let router = router();

        let matched = router.resolve(&Method::GET, "/files/readme").unwrap();
        assert_eq!(matched.route().pattern(), "/files/:name");

        let matched = router.resolve(&Method::PUT, "/files/readme").unwrap();
        assert_eq!(matched.route().pattern(), "/files/readme");
    }

    #[test]
    fn wildcard_method_only_answers_options() {
        let router = router();

        assert!(router.resolve(&Method::OPTIONS, "/cors").is_some());
        assert!(router.resolve(&Method::GET, "/cors").is_none());
        assert!(router.resolve(&Method::POST, "/cors").is_none());
    }

    #[test]
    fn allowed_methods_with_get() {
        let router = router();
        let allowed = router.allowed_methods("/users/42");

        assert_eq!(allowed, vec![Method::GET, Method::HEAD, Method::OPTIONS]);
    }

    #[test]
    fn allowed_methods_with_post_only() {
        let router = router();
        let allowed = router.allowed_methods("/users");

        assert_eq!(allowed, vec![Method::POST, Method::OPTIONS]);
        assert!(!allowed.contains(&Method::HEAD));
    }

    #[test]
    fn allowed_methods_collects_every_matching_pattern() {
        let router = router();
        let allowed = router.allowed_methods("/files/readme");

        assert_eq!(allowed, vec![Method::PUT, Method::GET, Method::HEAD, Method::OPTIONS]);
        assert_eq!(allow_header(&allowed), "PUT,GET,HEAD,OPTIONS");
    }

    #[test]
    fn allowed_methods_without_route() {
        let router = router();
        assert_eq!(router.allowed_methods("/nothing/here"), vec![Method::OPTIONS]);
        assert!(!router.matches_path("/nothing/here"));
        assert!(router.matches_path("/cors"));
    }

    #[test]
    fn server_methods_cover_the_table() {
        let router = router();
        assert_eq!(
            router.server_methods(),
            vec![Method::GET, Method::POST, Method::PUT, Method::HEAD, Method::OPTIONS]
        );
    }

    #[test]
    fn empty_router() {
        let router = Router::builder().build();

        assert!(router.routes().is_empty());
        assert!(router.resolve(&Method::GET, "/").is_none());
        assert_eq!(router.server_methods(), vec![Method::OPTIONS]);
    }
}
