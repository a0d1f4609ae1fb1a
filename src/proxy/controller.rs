//! Upstream resolution, authorization and dispatch.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use axum::{
    body::Body,
    http::{HeaderName, HeaderValue, Response},
};

use crate::error::ProxyError;
use crate::http::InboundRequest;
use crate::observability::metrics;
use crate::proxy::{normalize_path, LocalProxy, RemoteProxy};
use crate::security::{AccessDecision, AccessGate, ProxySubject, Vote, ALLOW_PROXY_ATTRIBUTE};
use crate::upstream::UpstreamConfig;

/// Response header naming the upstream a remote response came from.
pub const UPSTREAM_HEADER: &str = "x-bff-proxy-upstream";

/// Entry point of the forwarding engine.
pub struct BffProxy {
    remote: RemoteProxy,
    upstreams: HashMap<String, Arc<UpstreamConfig>>,
    local: Option<LocalProxy>,
    gate: Option<Arc<dyn AccessGate>>,
}

impl BffProxy {
    pub fn new(remote: RemoteProxy, upstreams: HashMap<String, Arc<UpstreamConfig>>) -> Self {
        Self {
            remote,
            upstreams,
            local: None,
            gate: None,
        }
    }

    pub fn with_local(mut self, local: LocalProxy) -> Self {
        self.local = Some(local);
        self
    }

    pub fn with_gate(mut self, gate: Arc<dyn AccessGate>) -> Self {
        self.gate = Some(gate);
        self
    }

    /// Proxies `request` to `route` on `upstream`.
    ///
    /// The local upstream wins over a remote upstream of the same name.
    pub async fn proxy(
        &self,
        upstream: &str,
        route: &str,
        request: InboundRequest,
    ) -> Result<Response<Body>, ProxyError> {
        let start = Instant::now();

        if let Some(local) = self.local.as_ref().filter(|l| l.is_upstream_supported(upstream)) {
            let result = local.proxy_request(route, request).await;
            metrics::record_request(upstream, metrics::KIND_LOCAL, status_of(&result), start);
            return result;
        }

        let result = self.proxy_remote(upstream, route, &request).await;
        if let Err(e) = &result {
            tracing::warn!(upstream, route, error = %e, "Proxy request failed");
        }
        // unconfigured names share one series
        let label = if self.upstreams.contains_key(upstream) {
            upstream
        } else {
            metrics::UNKNOWN_UPSTREAM
        };
        metrics::record_request(label, metrics::KIND_REMOTE, status_of(&result), start);
        result
    }

    async fn proxy_remote(
        &self,
        upstream: &str,
        route: &str,
        request: &InboundRequest,
    ) -> Result<Response<Body>, ProxyError> {
        let config = self
            .upstreams
            .get(upstream)
            .ok_or_else(|| ProxyError::UpstreamNotFound(upstream.to_string()))?;

        let route = normalize_path(route);

        if let Some(gate) = &self.gate {
            let subject = ProxySubject {
                upstream,
                route: &route,
                request,
                config: config.as_ref(),
            };
            let mut decision = AccessDecision::new();
            if gate.decide(&subject, ALLOW_PROXY_ATTRIBUTE, &mut decision) != Vote::Granted {
                return Err(ProxyError::Forbidden {
                    upstream: upstream.to_string(),
                    route,
                    decision,
                });
            }
        }

        tracing::info!(
            upstream,
            route = %route,
            request_uri = %request.uri(),
            method = %request.method(),
            "Forwarding request to upstream"
        );

        let mut response = self.remote.forward(&route, request, config).await?;

        let value = HeaderValue::from_str(upstream)
            .map_err(|_| ProxyError::Internal(format!("Invalid upstream name \"{}\".", upstream)))?;
        response
            .headers_mut()
            .insert(HeaderName::from_static(UPSTREAM_HEADER), value);

        Ok(response)
    }
}

fn status_of(result: &Result<Response<Body>, ProxyError>) -> u16 {
    match result {
        Ok(response) => response.status().as_u16(),
        Err(e) => e.status_code().as_u16(),
    }
}

impl fmt::Debug for BffProxy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut upstreams: Vec<&str> = self.upstreams.keys().map(String::as_str).collect();
        upstreams.sort_unstable();

        f.debug_struct("BffProxy")
            .field("remote", &self.remote)
            .field("upstreams", &upstreams)
            .field("local", &self.local)
            .field("gate", &self.gate.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use axum::http::{Method, StatusCode, Uri};

    use super::*;
    use crate::modifier::ModifierChain;
    use crate::routing::{
        MatchError, RequestContext, RequestKind, RouteMatch, RouteMatcher, SubRequestHandler,
    };
    use crate::security::{AffirmativeGate, Voter};
    use crate::upstream::tests::{recording_config_builder, RecordingClient};

    struct AnyRoute;

    impl RouteMatcher for AnyRoute {
        fn match_path(&self, _path: &str, _context: &RequestContext) -> Result<RouteMatch, MatchError> {
            Ok(RouteMatch {
                route: "any".into(),
                params: Default::default(),
            })
        }
    }

    struct LocalKernel;

    #[async_trait]
    impl SubRequestHandler for LocalKernel {
        async fn handle(&self, _request: InboundRequest, _kind: RequestKind) -> Result<Response<Body>, ProxyError> {
            Ok(Response::new(Body::from("local")))
        }
    }

    struct DenyAll;

    impl Voter for DenyAll {
        fn name(&self) -> &str {
            "deny_all"
        }

        fn supports_attribute(&self, _attribute: &str) -> bool {
            true
        }

        fn vote(&self, _subject: &ProxySubject<'_>, _attribute: &str) -> Vote {
            Vote::Denied
        }
    }

    struct RouteRecorder(std::sync::Mutex<Vec<String>>);

    impl Voter for RouteRecorder {
        fn name(&self) -> &str {
            "route_recorder"
        }

        fn supports_attribute(&self, _attribute: &str) -> bool {
            true
        }

        fn vote(&self, subject: &ProxySubject<'_>, _attribute: &str) -> Vote {
            self.0.lock().unwrap().push(format!("{}{}", subject.upstream, subject.route));
            Vote::Granted
        }
    }

    fn engine(name: &str, client: Arc<RecordingClient>) -> BffProxy {
        let mut upstreams = HashMap::new();
        upstreams.insert(name.to_string(), Arc::new(recording_config_builder(client).build()));
        BffProxy::new(RemoteProxy::new("bffProxy", ModifierChain::default()), upstreams)
    }

    fn local_proxy(name: &str) -> LocalProxy {
        LocalProxy::new(name, Arc::new(AnyRoute), Arc::new(LocalKernel))
    }

    fn get(uri: &'static str) -> InboundRequest {
        InboundRequest::new(Method::GET, Uri::from_static(uri))
    }

    async fn body(response: Response<Body>) -> String {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn test_remote_response_is_annotated() {
        let client = Arc::new(RecordingClient::ok());
        let proxy = engine("api", client.clone());

        let response = proxy.proxy("api", "users", get("/bff-proxy/api/users")).await.unwrap();

        assert_eq!(response.headers()[UPSTREAM_HEADER], "api");
        assert_eq!(client.last().uri, "/users");
    }

    #[test]
    fn test_unknown_upstreams_share_one_metric_series() {
        let recorder = metrics_exporter_prometheus::PrometheusBuilder::new().build_recorder();
        let handle = recorder.handle();
        let runtime = tokio::runtime::Builder::new_current_thread().build().unwrap();
        let proxy = engine("api", Arc::new(RecordingClient::ok()));

        ::metrics::with_local_recorder(&recorder, || {
            runtime.block_on(async {
                for i in 0..50 {
                    let name = format!("bogus{}", i);
                    assert!(proxy.proxy(&name, "/x", get("/")).await.is_err());
                }
                proxy.proxy("api", "/x", get("/")).await.unwrap();
            })
        });

        let rendered = handle.render();
        let series: Vec<&str> = rendered
            .lines()
            .filter(|line| line.starts_with("bff_proxy_requests_total{"))
            .collect();
        assert_eq!(series.len(), 2, "{}", rendered);
        assert!(series.iter().any(|line| line.contains("upstream=\"unknown\"") && line.ends_with(" 50")));
        assert!(series.iter().any(|line| line.contains("upstream=\"api\"")));
        assert!(!rendered.contains("bogus"));
    }

    #[tokio::test]
    async fn test_unknown_upstream() {
        let proxy = engine("api", Arc::new(RecordingClient::ok()));

        let err = proxy.proxy("other", "/users", get("/")).await.unwrap_err();
        assert!(matches!(&err, ProxyError::UpstreamNotFound(name) if name == "other"));
        assert_eq!(err.status_code(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_local_takes_precedence() {
        let client = Arc::new(RecordingClient::ok());
        let proxy = engine("local", client.clone()).with_local(local_proxy("local"));

        let response = proxy.proxy("local", "/anything", get("/")).await.unwrap();

        assert!(response.headers().get(UPSTREAM_HEADER).is_none());
        assert_eq!(body(response).await, "local");
        assert!(client.captured().is_empty());
    }

    #[tokio::test]
    async fn test_local_name_is_case_sensitive() {
        let client = Arc::new(RecordingClient::ok());
        let proxy = engine("LOCAL", client.clone()).with_local(local_proxy("local"));

        let response = proxy.proxy("LOCAL", "/anything", get("/")).await.unwrap();
        assert_eq!(response.headers()[UPSTREAM_HEADER], "LOCAL");
        assert_eq!(client.captured().len(), 1);
    }

    #[tokio::test]
    async fn test_gate_denial() {
        let client = Arc::new(RecordingClient::ok());
        let gate = AffirmativeGate::new(vec![Arc::new(DenyAll)]);
        let proxy = engine("api", client.clone()).with_gate(Arc::new(gate));

        let err = proxy.proxy("api", "/users", get("/")).await.unwrap_err();
        match err {
            ProxyError::Forbidden { upstream, route, decision } => {
                assert_eq!(upstream, "api");
                assert_eq!(route, "/users");
                assert_eq!(decision.result(), Some(Vote::Denied));
                assert_eq!(decision.votes()[0].voter, "deny_all");
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(client.captured().is_empty());
    }

    #[tokio::test]
    async fn test_gate_sees_normalized_route() {
        let recorder = Arc::new(RouteRecorder(Default::default()));
        let voter: Arc<dyn Voter> = recorder.clone();
        let gate = AffirmativeGate::new(vec![voter]);
        let proxy = engine("api", Arc::new(RecordingClient::ok())).with_gate(Arc::new(gate));

        proxy.proxy("api", "users", get("/")).await.unwrap();
        proxy.proxy("api", "/users", get("/")).await.unwrap();

        assert_eq!(*recorder.0.lock().unwrap(), vec!["api/users", "api/users"]);
    }

    #[tokio::test]
    async fn test_gate_does_not_apply_to_local() {
        let gate = AffirmativeGate::new(vec![Arc::new(DenyAll)]);
        let proxy = engine("api", Arc::new(RecordingClient::ok()))
            .with_local(local_proxy("local"))
            .with_gate(Arc::new(gate));

        let response = proxy.proxy("local", "/x", get("/")).await.unwrap();
        assert_eq!(body(response).await, "local");
    }
}
