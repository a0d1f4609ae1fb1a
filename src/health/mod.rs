//! Built-in local upstream.
//!
//! # Data Flow
//! ```text
//! GET {route_prefix}/{local_proxy}/health
//!     → LocalProxy (RouteTable: "health" → /health, GET)
//!     → AxumKernel (in-process router)
//!     → 200 {"status":"ok","route":"health"}
//! ```
//!
//! # Design Decisions
//! - The route table and the in-process router mount the same paths
//! - Wired by the binary only when `proxy.local_proxy` is configured

use std::sync::Arc;

use axum::{
    extract::Extension,
    http::Method,
    routing::get,
    Json, Router,
};
use serde_json::{json, Value};

use crate::proxy::LocalProxy;
use crate::routing::{AxumKernel, RequestKind, Route, RouteAttributes, RouteTable};

pub const HEALTH_ROUTE: &str = "health";
pub const HEALTH_PATH: &str = "/health";

pub fn route_table() -> RouteTable {
    RouteTable::new().route(Route::new(HEALTH_ROUTE, HEALTH_PATH).methods([Method::GET]))
}

pub fn router() -> Router {
    Router::new().route(HEALTH_PATH, get(health))
}

/// Local upstream named `name` serving the built-in routes.
pub fn local_proxy(name: impl Into<String>) -> LocalProxy {
    LocalProxy::new(name, Arc::new(route_table()), Arc::new(AxumKernel::new(router())))
}

async fn health(
    Extension(kind): Extension<RequestKind>,
    Extension(attributes): Extension<RouteAttributes>,
) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "route": attributes.route,
        "sub_request": kind == RequestKind::SubRequest,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::InboundRequest;
    use axum::http::{StatusCode, Uri};

    async fn call(method: Method, path: &str) -> Result<(StatusCode, Value), crate::error::ProxyError> {
        let request = InboundRequest::new(method, Uri::from_static("/bff-proxy/local/health"));
        let response = local_proxy("local").proxy_request(path, request).await?;
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        Ok((status, serde_json::from_slice(&bytes).unwrap()))
    }

    #[tokio::test]
    async fn test_health() {
        let (status, body) = call(Method::GET, "health").await.unwrap();
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"status": "ok", "route": "health", "sub_request": true}));
    }

    #[tokio::test]
    async fn test_health_rejects_post() {
        let err = call(Method::POST, "/health").await.unwrap_err();
        assert_eq!(err.status_code(), StatusCode::METHOD_NOT_ALLOWED);
    }

    #[tokio::test]
    async fn test_unknown_local_route() {
        let err = call(Method::GET, "/missing").await.unwrap_err();
        assert_eq!(err.status_code(), StatusCode::NOT_FOUND);
    }
}
