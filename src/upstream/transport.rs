//! Transport capabilities used to reach a remote upstream.
//!
//! # Responsibilities
//! - Build the outbound request skeleton (`RequestFactory`)
//! - Turn bytes into a request body (`StreamFactory`)
//! - Send the request (`HttpClient`)
//! - Adapt the upstream response, buffered or streamed (`ResponseFactory`)
//!
//! # Design Decisions
//! - Single attempt: no retries at this layer
//! - Deadlines belong to the client (`HyperClient::with_timeout`)
//! - Transport failures are opaque and surface unchanged

use std::error::Error as StdError;
use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{Method, Request, Response, Uri},
};
use bytes::Bytes;
use hyper::body::Incoming;
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};

use crate::error::ProxyError;

pub type BoxError = Box<dyn StdError + Send + Sync>;

/// Failure reported by an [`HttpClient`].
#[derive(Debug)]
pub struct TransportError {
    inner: BoxError,
}

impl TransportError {
    pub fn new(error: impl Into<BoxError>) -> Self {
        Self { inner: error.into() }
    }
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.inner, f)
    }
}

impl StdError for TransportError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.inner.source()
    }
}

/// Sends an outbound request and returns the upstream response.
#[async_trait]
pub trait HttpClient: Send + Sync {
    async fn send_request(&self, request: Request<Body>) -> Result<Response<Body>, TransportError>;
}

/// Creates the outbound request for a method and upstream path.
pub trait RequestFactory: Send + Sync {
    fn create_request(&self, method: &Method, path: &str) -> Result<Request<Body>, ProxyError>;
}

/// Wraps encoded bytes into a request body.
pub trait StreamFactory: Send + Sync {
    fn create_stream(&self, bytes: Bytes) -> Body;
}

/// Adapts an upstream response into the response returned to the client.
#[async_trait]
pub trait ResponseFactory: Send + Sync {
    async fn create_response(&self, response: Response<Body>, streamed: bool) -> Result<Response<Body>, ProxyError>;
}

/// [`HttpClient`] backed by the hyper-util connection pool.
#[derive(Clone)]
pub struct HyperClient {
    client: Client<HttpConnector, Body>,
    timeout: Option<Duration>,
}

impl HyperClient {
    pub fn new() -> Self {
        Self {
            client: Client::builder(TokioExecutor::new()).build(HttpConnector::new()),
            timeout: None,
        }
    }

    /// Fails requests that take longer than `timeout` to produce response headers.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

impl Default for HyperClient {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for HyperClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HyperClient")
            .field("timeout", &self.timeout)
            .finish()
    }
}

#[async_trait]
impl HttpClient for HyperClient {
    async fn send_request(&self, request: Request<Body>) -> Result<Response<Body>, TransportError> {
        let pending = self.client.request(request);
        let result = match self.timeout {
            Some(timeout) => tokio::time::timeout(timeout, pending).await.map_err(|_| {
                TransportError::new(format!("upstream did not respond within {:?}", timeout))
            })?,
            None => pending.await,
        };

        let response: Response<Incoming> = result.map_err(TransportError::new)?;
        let (parts, body) = response.into_parts();
        Ok(Response::from_parts(parts, Body::new(body)))
    }
}

/// [`RequestFactory`] resolving paths against an upstream base URL.
///
/// A base of `http://api:8080/v1` and a path of `/users?page=2` yields
/// `http://api:8080/v1/users?page=2`.
#[derive(Debug, Clone)]
pub struct BaseUriRequestFactory {
    base: Uri,
}

impl BaseUriRequestFactory {
    pub fn new(base: Uri) -> Self {
        Self { base }
    }

    fn resolve(&self, path: &str) -> String {
        let base_path = self.base.path().trim_end_matches('/');
        match (self.base.scheme_str(), self.base.authority()) {
            (Some(scheme), Some(authority)) => format!("{}://{}{}{}", scheme, authority, base_path, path),
            _ => format!("{}{}", base_path, path),
        }
    }
}

impl RequestFactory for BaseUriRequestFactory {
    fn create_request(&self, method: &Method, path: &str) -> Result<Request<Body>, ProxyError> {
        let target = self.resolve(path);
        let uri: Uri = target
            .parse()
            .map_err(|_| ProxyError::BadRequest(format!("Invalid upstream path \"{}\".", path)))?;

        Request::builder()
            .method(method.clone())
            .uri(uri)
            .body(Body::empty())
            .map_err(|e| ProxyError::Internal(e.to_string()))
    }
}

/// [`StreamFactory`] producing a fully buffered body.
#[derive(Debug, Clone, Copy, Default)]
pub struct BufferedStreamFactory;

impl StreamFactory for BufferedStreamFactory {
    fn create_stream(&self, bytes: Bytes) -> Body {
        Body::from(bytes)
    }
}

/// [`ResponseFactory`] that buffers the upstream body unless streaming is requested.
#[derive(Debug, Clone, Copy, Default)]
pub struct BodyResponseFactory;

#[async_trait]
impl ResponseFactory for BodyResponseFactory {
    async fn create_response(&self, response: Response<Body>, streamed: bool) -> Result<Response<Body>, ProxyError> {
        if streamed {
            return Ok(response);
        }

        let (parts, body) = response.into_parts();
        let bytes = axum::body::to_bytes(body, usize::MAX)
            .await
            .map_err(TransportError::new)?;
        Ok(Response::from_parts(parts, Body::from(bytes)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_against_base_path() {
        let factory = BaseUriRequestFactory::new(Uri::from_static("http://api.internal:8080/v1/"));
        let request = factory.create_request(&Method::POST, "/users?page=2").unwrap();

        assert_eq!(request.method(), Method::POST);
        assert_eq!(request.uri(), "http://api.internal:8080/v1/users?page=2");
    }

    #[test]
    fn test_resolve_without_base_path() {
        let factory = BaseUriRequestFactory::new(Uri::from_static("https://api.internal"));
        let request = factory.create_request(&Method::GET, "/path").unwrap();
        assert_eq!(request.uri(), "https://api.internal/path");
    }

    #[test]
    fn test_relative_base() {
        let factory = BaseUriRequestFactory::new(Uri::from_static("/"));
        let request = factory.create_request(&Method::GET, "/path?param=1").unwrap();
        assert_eq!(request.uri(), "/path?param=1");
    }

    #[test]
    fn test_invalid_path_is_rejected() {
        let factory = BaseUriRequestFactory::new(Uri::from_static("http://api"));
        assert!(matches!(
            factory.create_request(&Method::GET, "/has space"),
            Err(ProxyError::BadRequest(_))
        ));
    }

    #[tokio::test]
    async fn test_buffered_response_keeps_body() {
        let response = Response::builder()
            .header("content-type", "text/plain")
            .body(Body::from("hello"))
            .unwrap();

        let adapted = BodyResponseFactory.create_response(response, false).await.unwrap();
        assert_eq!(adapted.headers()["content-type"], "text/plain");
        let bytes = axum::body::to_bytes(adapted.into_body(), usize::MAX).await.unwrap();
        assert_eq!(bytes.as_ref(), b"hello");
    }

    #[tokio::test]
    async fn test_unreachable_upstream_is_transport_error() {
        let client = HyperClient::new().with_timeout(Duration::from_secs(2));
        let request = Request::builder()
            .uri("http://127.0.0.1:9/")
            .body(Body::empty())
            .unwrap();

        assert!(client.send_request(request).await.is_err());
    }
}
