//! JSON bodies: the decoded payload is serialized again.

use axum::{
    body::Body,
    http::{header, Request},
};
use bytes::Bytes;

use crate::error::ProxyError;
use crate::http::InboundRequest;
use crate::upstream::UpstreamConfig;

pub(super) fn supports(request: &InboundRequest) -> bool {
    request.content_type_format() == Some("json")
}

pub(super) fn transform(
    request: &InboundRequest,
    mut outbound: Request<Body>,
    config: &UpstreamConfig,
) -> Result<Request<Body>, ProxyError> {
    let payload = request.payload()?;
    let body = serde_json::to_vec(&payload).map_err(ProxyError::Encoding)?;

    if let Some(content_type) = request.headers().get(header::CONTENT_TYPE) {
        outbound
            .headers_mut()
            .insert(header::CONTENT_TYPE, content_type.clone());
    }
    *outbound.body_mut() = config.stream_factory().create_stream(Bytes::from(body));

    Ok(outbound)
}
