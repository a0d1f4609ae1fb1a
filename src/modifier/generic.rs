//! Catch-all: the raw body is forwarded untouched.

use axum::{
    body::Body,
    http::{header, Request},
};

use crate::error::ProxyError;
use crate::http::InboundRequest;
use crate::upstream::UpstreamConfig;

pub(super) fn transform(
    request: &InboundRequest,
    mut outbound: Request<Body>,
    config: &UpstreamConfig,
) -> Result<Request<Body>, ProxyError> {
    if let Some(content_type) = request.headers().get(header::CONTENT_TYPE) {
        outbound
            .headers_mut()
            .insert(header::CONTENT_TYPE, content_type.clone());
    }
    *outbound.body_mut() = config.stream_factory().create_stream(request.body().clone());

    Ok(outbound)
}
