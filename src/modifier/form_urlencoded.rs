//! `application/x-www-form-urlencoded` bodies, re-encoded from the decoded fields.

use axum::{
    body::Body,
    http::{header, HeaderValue, Request},
};
use bytes::Bytes;

use crate::error::ProxyError;
use crate::http::query::{build_query, Encoding};
use crate::http::request::FORM_URLENCODED;
use crate::http::InboundRequest;
use crate::upstream::UpstreamConfig;

pub(super) fn supports(request: &InboundRequest) -> bool {
    request.content_type() == Some(FORM_URLENCODED)
}

pub(super) fn transform(
    request: &InboundRequest,
    mut outbound: Request<Body>,
    config: &UpstreamConfig,
) -> Result<Request<Body>, ProxyError> {
    let body = build_query(request.params(), Encoding::Rfc3986);

    outbound
        .headers_mut()
        .insert(header::CONTENT_TYPE, HeaderValue::from_static(FORM_URLENCODED));
    *outbound.body_mut() = config.stream_factory().create_stream(Bytes::from(body));

    Ok(outbound)
}
