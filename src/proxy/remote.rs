//! Forwarding to a remote upstream.
//!
//! # Responsibilities
//! - Strip the reserved options parameter from the forwarded query
//! - Copy allowed request headers (multi-valued headers stay multi-valued)
//! - Rebuild the body through the modifier chain
//! - Send once, adapt the response, filter response headers in place
//!
//! # Design Decisions
//! - Options are parsed before sending, so malformed options never reach the upstream
//! - Transport errors propagate unchanged

use axum::{
    body::Body,
    http::{HeaderMap, HeaderName, Response},
};

use crate::error::ProxyError;
use crate::http::options::ProxyOptions;
use crate::http::query::{build_query, encode_path, Encoding};
use crate::http::InboundRequest;
use crate::modifier::ModifierChain;
use crate::upstream::{HeaderPolicy, UpstreamConfig};

#[derive(Debug, Clone)]
pub struct RemoteProxy {
    options_parameter: String,
    modifiers: ModifierChain,
}

impl RemoteProxy {
    pub fn new(options_parameter: impl Into<String>, modifiers: ModifierChain) -> Self {
        Self {
            options_parameter: options_parameter.into(),
            modifiers,
        }
    }

    /// Forwards `request` to `path` on the upstream described by `config`.
    pub async fn forward(
        &self,
        path: &str,
        request: &InboundRequest,
        config: &UpstreamConfig,
    ) -> Result<Response<Body>, ProxyError> {
        let mut query = request.query();
        let options = ProxyOptions::from_query(&query, &self.options_parameter)?;
        query.shift_remove(&self.options_parameter);

        let mut target = encode_path(path);
        let query_string = build_query(&query, Encoding::Rfc1738);
        if !query_string.is_empty() {
            target.push('?');
            target.push_str(&query_string);
        }

        let mut outbound = config.request_factory().create_request(request.method(), &target)?;
        copy_request_headers(request.headers(), outbound.headers_mut(), config.request_headers());
        let outbound = self.modifiers.apply(request, outbound, config)?;

        tracing::debug!(
            method = %outbound.method(),
            uri = %outbound.uri(),
            streamed = options.streamed,
            "Sending upstream request"
        );
        let response = config.http_client().send_request(outbound).await?;

        let mut response = config
            .response_factory()
            .create_response(response, options.streamed)
            .await?;
        filter_response_headers(response.headers_mut(), config.response_headers());

        Ok(response)
    }
}

fn copy_request_headers(from: &HeaderMap, to: &mut HeaderMap, policy: &HeaderPolicy) {
    for name in from.keys() {
        if !policy.allows(name.as_str()) {
            tracing::debug!(header = %name, "Request header not forwarded");
            continue;
        }
        for value in from.get_all(name) {
            to.append(name.clone(), value.clone());
        }
    }
}

fn filter_response_headers(headers: &mut HeaderMap, policy: &HeaderPolicy) {
    let dropped: Vec<HeaderName> = headers
        .keys()
        .filter(|name| !policy.allows(name.as_str()))
        .cloned()
        .collect();

    for name in dropped {
        tracing::debug!(header = %name, "Response header removed");
        headers.remove(&name);
    }
}
