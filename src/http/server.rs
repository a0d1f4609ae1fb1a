//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create the Axum Router mounting the proxy route
//! - Wire up middleware (tracing, timeout, body limit, request ID)
//! - Buffer and decode the inbound request
//! - Hand the request to the forwarding engine
//! - Serve with graceful shutdown

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Body,
    extract::{DefaultBodyLimit, Path, State},
    http::Request,
    response::{IntoResponse, Response},
    routing::any,
    Router,
};
use tokio::net::TcpListener;
use tower_http::{
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::config::validation::is_ascii_slug;
use crate::config::ServerConfig;
use crate::error::ProxyError;
use crate::http::InboundRequest;
use crate::proxy::BffProxy;

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub proxy: Arc<BffProxy>,
    pub max_body_bytes: usize,
}

/// Build the Axum router with all middleware layers.
///
/// `{route_prefix}/{upstream}/{*route}` is mounted together with the bare
/// `{route_prefix}/{upstream}` forms, which reach the engine with an empty route.
#[allow(deprecated)]
pub fn build_app(proxy: Arc<BffProxy>, config: &ServerConfig) -> Router {
    let prefix = config.route_prefix.trim_end_matches('/');
    let state = AppState {
        proxy,
        max_body_bytes: config.max_body_bytes,
    };

    Router::new()
        .route(&format!("{}/{{upstream}}", prefix), any(proxy_handler))
        .route(&format!("{}/{{upstream}}/", prefix), any(proxy_handler))
        .route(&format!("{}/{{upstream}}/{{*route}}", prefix), any(proxy_handler))
        .with_state(state)
        .layer(DefaultBodyLimit::max(config.max_body_bytes))
        .layer(TimeoutLayer::new(Duration::from_secs(config.request_timeout_secs)))
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(TraceLayer::new_for_http())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
}

/// HTTP server for the gateway.
pub struct HttpServer {
    router: Router,
}

impl HttpServer {
    pub fn new(proxy: Arc<BffProxy>, config: &ServerConfig) -> Self {
        Self {
            router: build_app(proxy, config),
        }
    }

    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Run the server, accepting connections on the given listener.
    pub async fn run(self, listener: TcpListener) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        axum::serve(listener, self.router)
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

async fn proxy_handler(
    State(state): State<AppState>,
    Path(params): Path<HashMap<String, String>>,
    request: Request<Body>,
) -> Response {
    let upstream = params.get("upstream").map(String::as_str).unwrap_or_default();
    let route = params.get("route").map(String::as_str).unwrap_or_default();

    if !is_ascii_slug(upstream) {
        return ProxyError::UpstreamNotFound(upstream.to_string()).into_response();
    }

    let inbound = match InboundRequest::from_request(request, state.max_body_bytes).await {
        Ok(inbound) => inbound,
        Err(e) => return e.into_response(),
    };

    match state.proxy.proxy(upstream, route, inbound).await {
        Ok(response) => response,
        Err(e) => e.into_response(),
    }
}

/// Wait for shutdown signal (Ctrl+C).
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to install Ctrl+C handler");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modifier::ModifierChain;
    use crate::proxy::RemoteProxy;
    use axum::http::StatusCode;
    use tower::ServiceExt;

    fn app(config: &ServerConfig) -> Router {
        let proxy = BffProxy::new(RemoteProxy::new("bffProxy", ModifierChain::default()), HashMap::new());
        build_app(Arc::new(proxy), config)
    }

    async fn status(router: Router, uri: &str) -> (StatusCode, Option<String>) {
        let response = router
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let request_id = response
            .headers()
            .get("x-request-id")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        (response.status(), request_id)
    }

    #[tokio::test]
    async fn test_unknown_upstream_is_not_found() {
        let (code, request_id) = status(app(&ServerConfig::default()), "/bff-proxy/api/users").await;
        assert_eq!(code, StatusCode::NOT_FOUND);
        assert!(request_id.is_some());
    }

    #[tokio::test]
    async fn test_non_slug_upstream_is_not_found() {
        let (code, _) = status(app(&ServerConfig::default()), "/bff-proxy/api_v2/users").await;
        assert_eq!(code, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_outside_prefix_is_not_routed() {
        let (code, _) = status(app(&ServerConfig::default()), "/other/api/users").await;
        assert_eq!(code, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_custom_prefix() {
        let config = ServerConfig {
            route_prefix: "/gateway/".into(),
            ..ServerConfig::default()
        };
        let (code, _) = status(app(&config), "/gateway/api").await;
        assert_eq!(code, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_body_limit() {
        let config = ServerConfig {
            max_body_bytes: 4,
            ..ServerConfig::default()
        };
        let response = app(&config)
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/bff-proxy/api/users")
                    .body(Body::from("0123456789"))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    }
}
