//! Route matching for local dispatch.
//!
//! # Responsibilities
//! - Match a path against `/segment/{param}` templates
//! - Match the host condition (exact match, case-insensitive)
//! - Distinguish "no route" from "route exists, wrong method"
//!
//! # Design Decisions
//! - Host matching is case-insensitive, path matching is case-sensitive
//! - A route without methods accepts every method
//! - GET implies HEAD
//! - No regex, segments are compared one by one

use axum::http::{header, uri::Authority, Method};
use indexmap::IndexMap;
use thiserror::Error;

use crate::http::InboundRequest;

/// Parameters captured from a path template, in template order.
pub type Params = IndexMap<String, String>;

/// Routing context inherited from the request being proxied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestContext {
    pub method: Method,
    pub host: Option<String>,
}

impl RequestContext {
    pub fn from_request(request: &InboundRequest) -> Self {
        let host = request
            .headers()
            .get(header::HOST)
            .and_then(|h| h.to_str().ok())
            .and_then(|h| h.parse::<Authority>().ok())
            .map(|a| a.host().to_lowercase())
            .or_else(|| request.uri().host().map(str::to_lowercase));

        Self {
            method: request.method().clone(),
            host,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteMatch {
    pub route: String,
    pub params: Params,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MatchError {
    #[error("no route matches the path")]
    NotFound,

    #[error("method not allowed")]
    MethodNotAllowed(Vec<Method>),
}

/// Resolves a local path to a route.
pub trait RouteMatcher: Send + Sync {
    fn match_path(&self, path: &str, context: &RequestContext) -> Result<RouteMatch, MatchError>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Static(String),
    Param(String),
}

/// A named path template.
#[derive(Debug, Clone)]
pub struct Route {
    name: String,
    segments: Vec<Segment>,
    methods: Vec<Method>,
    host: Option<String>,
}

impl Route {
    pub fn new(name: impl Into<String>, template: &str) -> Self {
        let segments = split(template)
            .map(|segment| {
                match segment.strip_prefix('{').and_then(|s| s.strip_suffix('}')) {
                    Some(param) if !param.is_empty() => Segment::Param(param.to_string()),
                    _ => Segment::Static(segment.to_string()),
                }
            })
            .collect();

        Self {
            name: name.into(),
            segments,
            methods: Vec::new(),
            host: None,
        }
    }

    pub fn methods(mut self, methods: impl IntoIterator<Item = Method>) -> Self {
        self.methods = methods.into_iter().collect();
        self
    }

    /// Restricts the route to one host. The host is normalized to lowercase.
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.host = Some(host.into().to_lowercase());
        self
    }

    fn matches_host(&self, host: Option<&str>) -> bool {
        match &self.host {
            Some(expected) => host == Some(expected.as_str()),
            None => true,
        }
    }

    fn capture(&self, path: &str) -> Option<Params> {
        let mut params = Params::new();
        let mut parts = split(path);

        for segment in &self.segments {
            let part = parts.next()?;
            match segment {
                Segment::Static(expected) if expected == part => {}
                Segment::Param(name) if !part.is_empty() => {
                    params.insert(name.clone(), part.to_string());
                }
                _ => return None,
            }
        }

        match parts.next() {
            Some(_) => None,
            None => Some(params),
        }
    }

    fn allows(&self, method: &Method) -> bool {
        self.methods.is_empty()
            || self.methods.contains(method)
            || (method == Method::HEAD && self.methods.contains(&Method::GET))
    }

    fn allowed_methods(&self) -> Vec<Method> {
        let mut allowed = self.methods.clone();
        if allowed.contains(&Method::GET) && !allowed.contains(&Method::HEAD) {
            allowed.push(Method::HEAD);
        }
        allowed
    }
}

fn split(path: &str) -> std::str::Split<'_, char> {
    path.strip_prefix('/').unwrap_or(path).split('/')
}

/// Ordered route list. The first route matching path, host and method wins.
#[derive(Debug, Clone, Default)]
pub struct RouteTable {
    routes: Vec<Route>,
}

impl RouteTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn route(mut self, route: Route) -> Self {
        self.routes.push(route);
        self
    }
}

impl RouteMatcher for RouteTable {
    fn match_path(&self, path: &str, context: &RequestContext) -> Result<RouteMatch, MatchError> {
        let mut allowed: Vec<Method> = Vec::new();

        for route in &self.routes {
            if !route.matches_host(context.host.as_deref()) {
                continue;
            }
            let Some(params) = route.capture(path) else {
                continue;
            };

            if route.allows(&context.method) {
                return Ok(RouteMatch {
                    route: route.name.clone(),
                    params,
                });
            }

            for method in route.allowed_methods() {
                if !allowed.contains(&method) {
                    allowed.push(method);
                }
            }
        }

        if allowed.is_empty() {
            Err(MatchError::NotFound)
        } else {
            Err(MatchError::MethodNotAllowed(allowed))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{HeaderValue, Uri};

    fn context(method: Method) -> RequestContext {
        RequestContext {
            method,
            host: Some("example.com".into()),
        }
    }

    fn table() -> RouteTable {
        RouteTable::new()
            .route(Route::new("health", "/health").methods([Method::GET]))
            .route(Route::new("user_show", "/users/{id}").methods([Method::GET]))
            .route(Route::new("user_update", "/users/{id}").methods([Method::PUT, Method::PATCH]))
            .route(Route::new("admin", "/admin").host("ADMIN.example.com"))
    }

    #[test]
    fn test_static_route() {
        let matched = table().match_path("/health", &context(Method::GET)).unwrap();
        assert_eq!(matched.route, "health");
        assert!(matched.params.is_empty());
    }

    #[test]
    fn test_params_are_captured() {
        let matched = table().match_path("/users/42", &context(Method::PATCH)).unwrap();
        assert_eq!(matched.route, "user_update");
        assert_eq!(matched.params.get("id").map(String::as_str), Some("42"));
    }

    #[test]
    fn test_get_implies_head() {
        let matched = table().match_path("/health", &context(Method::HEAD)).unwrap();
        assert_eq!(matched.route, "health");
    }

    #[test]
    fn test_not_found() {
        let table = table();
        assert_eq!(table.match_path("/nope", &context(Method::GET)), Err(MatchError::NotFound));
        assert_eq!(table.match_path("/users", &context(Method::GET)), Err(MatchError::NotFound));
        assert_eq!(table.match_path("/users/", &context(Method::GET)), Err(MatchError::NotFound));
        assert_eq!(table.match_path("/health/x", &context(Method::GET)), Err(MatchError::NotFound));
        assert_eq!(table.match_path("/HEALTH", &context(Method::GET)), Err(MatchError::NotFound));
    }

    #[test]
    fn test_method_not_allowed_unions_routes() {
        let result = table().match_path("/users/42", &context(Method::DELETE));
        assert_eq!(
            result,
            Err(MatchError::MethodNotAllowed(vec![
                Method::GET,
                Method::HEAD,
                Method::PUT,
                Method::PATCH
            ]))
        );
    }

    #[test]
    fn test_host_condition() {
        let table = table();
        assert_eq!(table.match_path("/admin", &context(Method::GET)), Err(MatchError::NotFound));

        let mut admin = context(Method::DELETE);
        admin.host = Some("admin.example.com".into());
        assert_eq!(table.match_path("/admin", &admin).unwrap().route, "admin");
    }

    #[test]
    fn test_context_from_request() {
        let request = InboundRequest::new(Method::POST, Uri::from_static("/bff-proxy/local/x"))
            .with_header(header::HOST, HeaderValue::from_static("Example.COM:8080"));

        let context = RequestContext::from_request(&request);
        assert_eq!(context.method, Method::POST);
        assert_eq!(context.host.as_deref(), Some("example.com"));
    }
}
