//! Form bodies other than plain url-encoded ones, rebuilt as `multipart/form-data`.

use axum::{
    body::Body,
    http::{header, Request},
};

use crate::error::ProxyError;
use crate::http::form::{flatten, FormData, FormValue};
use crate::http::multipart::{MultipartBody, Part};
use crate::http::request::FORM_URLENCODED;
use crate::http::InboundRequest;
use crate::upstream::UpstreamConfig;

pub(super) fn supports(request: &InboundRequest) -> bool {
    request.content_type_format() == Some("form") && request.content_type() != Some(FORM_URLENCODED)
}

pub(super) fn transform(
    request: &InboundRequest,
    mut outbound: Request<Body>,
    config: &UpstreamConfig,
) -> Result<Request<Body>, ProxyError> {
    let mut parts = text_parts(request.params());
    if config.support_file_upload() {
        parts.extend(file_parts(request.files()));
    }

    let multipart = MultipartBody::new(parts);
    for (name, value) in multipart.prepared_headers().iter() {
        outbound.headers_mut().append(name.clone(), value.clone());
    }

    tracing::debug!(
        parts = multipart.parts().len(),
        boundary = multipart.boundary(),
        content_type = ?outbound.headers().get(header::CONTENT_TYPE),
        "Multipart body rebuilt"
    );
    *outbound.body_mut() = config.stream_factory().create_stream(multipart.to_bytes());

    Ok(outbound)
}

fn text_parts(data: &FormData) -> Vec<Part> {
    flatten(data)
        .into_iter()
        .filter_map(|(name, leaf)| match leaf {
            FormValue::Text(value) => Some(Part::text(name, value.clone())),
            _ => None,
        })
        .collect()
}

fn file_parts(data: &FormData) -> Vec<Part> {
    flatten(data)
        .into_iter()
        .filter_map(|(name, leaf)| match leaf {
            FormValue::File(file) => Some(Part::file(name, file.clone())),
            _ => None,
        })
        .collect()
}
