//! Remote upstream subsystem.
//!
//! # Data Flow
//! ```text
//! [upstreams.<name>] settings (startup)
//!     → config.rs (UpstreamConfig: header policies, file upload flag)
//!     → transport.rs (HyperClient + BaseUriRequestFactory + factories)
//!     → HashMap<name, Arc<UpstreamConfig>>, read-only afterwards
//! ```
//!
//! # Design Decisions
//! - One config per named upstream, shared through `Arc`
//! - Transport pieces are trait objects so tests can swap them out
//! - Header name sets are lower-cased once, at construction

pub mod config;
pub mod transport;

use std::collections::HashMap;
use std::sync::Arc;

use indexmap::IndexMap;

pub use config::{
    HeaderPolicy, UpstreamConfig, UpstreamConfigBuilder, DEFAULT_REQUEST_PASSTHROUGH_HEADERS,
    DEFAULT_RESPONSE_PASSTHROUGH_HEADERS,
};
pub use transport::{
    BaseUriRequestFactory, BodyResponseFactory, BoxError, BufferedStreamFactory, HttpClient,
    HyperClient, RequestFactory, ResponseFactory, StreamFactory, TransportError,
};

use crate::config::UpstreamSettings;

/// Builds every configured upstream.
pub fn build_upstreams(
    settings: &IndexMap<String, UpstreamSettings>,
) -> Result<HashMap<String, Arc<UpstreamConfig>>, axum::http::uri::InvalidUri> {
    settings
        .iter()
        .map(|(name, upstream)| {
            let config = UpstreamConfig::from_settings(upstream)?;
            tracing::debug!(upstream = %name, base_url = %upstream.base_url, ?config, "Upstream configured");
            Ok((name.clone(), Arc::new(config)))
        })
        .collect()
}
