//! Dispatch to the in-process local upstream.

use std::fmt;
use std::sync::Arc;

use axum::{
    body::Body,
    http::{Response, Uri},
};

use crate::error::ProxyError;
use crate::http::query::encode_path;
use crate::http::InboundRequest;
use crate::proxy::normalize_path;
use crate::routing::{
    MatchError, RequestContext, RequestKind, RouteAttributes, RouteMatcher, RouteParams, Stateless,
    SubRequestHandler,
};

/// The single upstream served by this process.
pub struct LocalProxy {
    name: String,
    matcher: Arc<dyn RouteMatcher>,
    kernel: Arc<dyn SubRequestHandler>,
}

impl LocalProxy {
    pub fn new(
        name: impl Into<String>,
        matcher: Arc<dyn RouteMatcher>,
        kernel: Arc<dyn SubRequestHandler>,
    ) -> Self {
        Self {
            name: name.into(),
            matcher,
            kernel,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Exact, case-sensitive name comparison.
    pub fn is_upstream_supported(&self, upstream: &str) -> bool {
        self.name == upstream
    }

    /// Matches `path` and handles the derived request as a sub-request.
    pub async fn proxy_request(&self, path: &str, request: InboundRequest) -> Result<Response<Body>, ProxyError> {
        let path = path.trim();
        if path.is_empty() {
            return Err(ProxyError::BadRequest("Missing mandatory parameter \"path\".".to_string()));
        }
        let path = normalize_path(path);

        let context = RequestContext::from_request(&request);
        let matched = self.matcher.match_path(&path, &context).map_err(|e| match e {
            MatchError::NotFound => ProxyError::NotFound(path.clone()),
            MatchError::MethodNotAllowed(allowed) => ProxyError::MethodNotAllowed {
                path: path.clone(),
                allowed,
            },
        })?;

        tracing::info!(
            route = %matched.route,
            route_parameters = ?matched.params,
            request_uri = %request.uri(),
            method = %request.method(),
            "Forward to local route"
        );

        let uri = local_uri(&path, request.uri())?;
        let mut sub_request = request;
        sub_request.set_uri(uri);
        let extensions = sub_request.extensions_mut();
        extensions.insert(RouteParams(matched.params.clone()));
        extensions.insert(RouteAttributes {
            route: matched.route,
            params: matched.params,
        });
        extensions.insert(Stateless(false));

        self.kernel.handle(sub_request, RequestKind::SubRequest).await
    }
}

impl fmt::Debug for LocalProxy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LocalProxy").field("name", &self.name).finish_non_exhaustive()
    }
}

/// The local path, keeping the original query string.
fn local_uri(path: &str, original: &Uri) -> Result<Uri, ProxyError> {
    let mut target = encode_path(path);
    if let Some(query) = original.query() {
        target.push('?');
        target.push_str(query);
    }

    target
        .parse()
        .map_err(|_| ProxyError::BadRequest(format!("Invalid local path \"{}\".", path)))
}
