//! In-process sub-request dispatch.

use std::convert::Infallible;

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{Extensions, Response},
    Router,
};
use tower::ServiceExt;
use tower_http::request_id::RequestId;

use crate::error::ProxyError;
use crate::http::InboundRequest;
use crate::routing::matcher::Params;

/// Whether a request came from a client or was derived in-process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestKind {
    Main,
    SubRequest,
}

/// Route name and captured parameters of a derived request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteAttributes {
    pub route: String,
    pub params: Params,
}

/// Full parameter set of the matched route.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteParams(pub Params);

/// `Stateless(false)` keeps session and authorization middleware active for
/// the derived request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Stateless(pub bool);

/// Handles a derived request without a network round-trip.
#[async_trait]
pub trait SubRequestHandler: Send + Sync {
    async fn handle(&self, request: InboundRequest, kind: RequestKind) -> Result<Response<Body>, ProxyError>;
}

/// Dispatches derived requests through an axum [`Router`].
///
/// The router sees the request URI as is, so callers rewrite it to the local
/// path first. The derived request starts from a fresh extension set holding
/// the [`RequestKind`], the route extensions and the request id; extensions
/// the outer router stored (matched path, path parameters) are not inherited.
#[derive(Debug, Clone)]
pub struct AxumKernel {
    router: Router,
}

impl AxumKernel {
    pub fn new(router: Router) -> Self {
        Self { router }
    }
}

#[async_trait]
impl SubRequestHandler for AxumKernel {
    async fn handle(&self, request: InboundRequest, kind: RequestKind) -> Result<Response<Body>, ProxyError> {
        let mut request = request.into_http();
        let inherited = std::mem::take(request.extensions_mut());

        let extensions = request.extensions_mut();
        extensions.insert(kind);
        inherit::<RouteAttributes>(&inherited, extensions);
        inherit::<RouteParams>(&inherited, extensions);
        inherit::<Stateless>(&inherited, extensions);
        inherit::<RequestId>(&inherited, extensions);

        let response: Result<Response<Body>, Infallible> = self.router.clone().oneshot(request).await;
        match response {
            Ok(response) => Ok(response),
            Err(never) => match never {},
        }
    }
}

fn inherit<T: Clone + Send + Sync + 'static>(from: &Extensions, to: &mut Extensions) {
    if let Some(value) = from.get::<T>() {
        to.insert(value.clone());
    }
}
