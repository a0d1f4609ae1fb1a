//! Per-upstream forwarding policy.

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use axum::http::Uri;

use crate::config::UpstreamSettings;
use crate::upstream::transport::{
    BaseUriRequestFactory, BodyResponseFactory, BufferedStreamFactory, HttpClient, HyperClient,
    RequestFactory, ResponseFactory, StreamFactory,
};

/// Request headers always forwarded.
pub const DEFAULT_REQUEST_PASSTHROUGH_HEADERS: &[&str] = &["accept", "accept-language", "range"];

/// Response headers always returned to the client.
pub const DEFAULT_RESPONSE_PASSTHROUGH_HEADERS: &[&str] = &[
    "cache-control",
    "expires",
    "last-modified",
    "pragma",
    "content-language",
    "content-length",
    "content-type",
    "www-authenticate",
    "range",
];

/// Which headers may cross the forwarding boundary.
///
/// Names are stored lower-cased. `x-` headers match by prefix when
/// enabled; every other name must match exactly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderPolicy {
    x_headers: bool,
    names: HashSet<String>,
}

impl HeaderPolicy {
    pub fn new<I, S>(x_headers: bool, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            x_headers,
            names: names
                .into_iter()
                .map(|n| n.as_ref().to_ascii_lowercase())
                .collect(),
        }
    }

    /// Default list extended with `extra`.
    pub fn with_defaults<I, S>(x_headers: bool, defaults: &[&str], extra: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut policy = Self::new(x_headers, defaults);
        policy
            .names
            .extend(extra.into_iter().map(|n| n.as_ref().to_ascii_lowercase()));
        policy
    }

    pub fn allows(&self, name: &str) -> bool {
        if self.x_headers && name.get(..2).is_some_and(|p| p.eq_ignore_ascii_case("x-")) {
            return true;
        }
        self.names.contains(&name.to_ascii_lowercase())
    }
}

/// Immutable configuration of one remote upstream.
pub struct UpstreamConfig {
    http_client: Arc<dyn HttpClient>,
    request_factory: Arc<dyn RequestFactory>,
    stream_factory: Arc<dyn StreamFactory>,
    response_factory: Arc<dyn ResponseFactory>,
    request_headers: HeaderPolicy,
    response_headers: HeaderPolicy,
    support_file_upload: bool,
}

impl UpstreamConfig {
    pub fn builder(
        http_client: Arc<dyn HttpClient>,
        request_factory: Arc<dyn RequestFactory>,
    ) -> UpstreamConfigBuilder {
        UpstreamConfigBuilder {
            http_client,
            request_factory,
            stream_factory: Arc::new(BufferedStreamFactory),
            response_factory: Arc::new(BodyResponseFactory),
            passthrough_request_x_headers: true,
            passthrough_request_headers: Vec::new(),
            passthrough_response_x_headers: true,
            passthrough_response_headers: Vec::new(),
            support_file_upload: true,
        }
    }

    /// Builds a hyper-backed upstream from file settings.
    ///
    /// `base_url` must already be validated.
    pub fn from_settings(settings: &UpstreamSettings) -> Result<Self, axum::http::uri::InvalidUri> {
        let base: Uri = settings.base_url.parse()?;

        let mut client = HyperClient::new();
        if let Some(secs) = settings.timeout_secs {
            client = client.with_timeout(Duration::from_secs(secs));
        }

        Ok(Self::builder(Arc::new(client), Arc::new(BaseUriRequestFactory::new(base)))
            .passthrough_request_x_headers(settings.passthrough_request_x_headers)
            .passthrough_request_headers(&settings.passthrough_request_headers)
            .passthrough_response_x_headers(settings.passthrough_response_x_headers)
            .passthrough_response_headers(&settings.passthrough_response_headers)
            .support_file_upload(settings.support_file_upload)
            .build())
    }

    pub fn http_client(&self) -> &dyn HttpClient {
        self.http_client.as_ref()
    }

    pub fn request_factory(&self) -> &dyn RequestFactory {
        self.request_factory.as_ref()
    }

    pub fn stream_factory(&self) -> &dyn StreamFactory {
        self.stream_factory.as_ref()
    }

    pub fn response_factory(&self) -> &dyn ResponseFactory {
        self.response_factory.as_ref()
    }

    pub fn request_headers(&self) -> &HeaderPolicy {
        &self.request_headers
    }

    pub fn response_headers(&self) -> &HeaderPolicy {
        &self.response_headers
    }

    pub fn support_file_upload(&self) -> bool {
        self.support_file_upload
    }
}

impl fmt::Debug for UpstreamConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UpstreamConfig")
            .field("request_headers", &self.request_headers)
            .field("response_headers", &self.response_headers)
            .field("support_file_upload", &self.support_file_upload)
            .finish_non_exhaustive()
    }
}

/// Builder for [`UpstreamConfig`].
pub struct UpstreamConfigBuilder {
    http_client: Arc<dyn HttpClient>,
    request_factory: Arc<dyn RequestFactory>,
    stream_factory: Arc<dyn StreamFactory>,
    response_factory: Arc<dyn ResponseFactory>,
    passthrough_request_x_headers: bool,
    passthrough_request_headers: Vec<String>,
    passthrough_response_x_headers: bool,
    passthrough_response_headers: Vec<String>,
    support_file_upload: bool,
}

impl UpstreamConfigBuilder {
    pub fn stream_factory(mut self, factory: Arc<dyn StreamFactory>) -> Self {
        self.stream_factory = factory;
        self
    }

    pub fn response_factory(mut self, factory: Arc<dyn ResponseFactory>) -> Self {
        self.response_factory = factory;
        self
    }

    pub fn passthrough_request_x_headers(mut self, enabled: bool) -> Self {
        self.passthrough_request_x_headers = enabled;
        self
    }

    /// Extra request headers, added to [`DEFAULT_REQUEST_PASSTHROUGH_HEADERS`].
    pub fn passthrough_request_headers<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.passthrough_request_headers
            .extend(names.into_iter().map(|n| n.as_ref().to_string()));
        self
    }

    pub fn passthrough_response_x_headers(mut self, enabled: bool) -> Self {
        self.passthrough_response_x_headers = enabled;
        self
    }

    /// Extra response headers, added to [`DEFAULT_RESPONSE_PASSTHROUGH_HEADERS`].
    pub fn passthrough_response_headers<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.passthrough_response_headers
            .extend(names.into_iter().map(|n| n.as_ref().to_string()));
        self
    }

    pub fn support_file_upload(mut self, enabled: bool) -> Self {
        self.support_file_upload = enabled;
        self
    }

    pub fn build(self) -> UpstreamConfig {
        UpstreamConfig {
            http_client: self.http_client,
            request_factory: self.request_factory,
            stream_factory: self.stream_factory,
            response_factory: self.response_factory,
            request_headers: HeaderPolicy::with_defaults(
                self.passthrough_request_x_headers,
                DEFAULT_REQUEST_PASSTHROUGH_HEADERS,
                self.passthrough_request_headers,
            ),
            response_headers: HeaderPolicy::with_defaults(
                self.passthrough_response_x_headers,
                DEFAULT_RESPONSE_PASSTHROUGH_HEADERS,
                self.passthrough_response_headers,
            ),
            support_file_upload: self.support_file_upload,
        }
    }
}
