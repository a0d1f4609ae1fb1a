//! Inbound request representation.
//!
//! # Responsibilities
//! - Buffer the client body (bounded) so it can be re-encoded for the upstream
//! - Decode form and multipart bodies into parameter and file trees
//! - Classify the content type into a coarse format (`json`, `form`, ...)
//! - Expose the decoded JSON payload used by the JSON request modifier
//!
//! # Design Decisions
//! - Decoding happens once, before any forwarding decision is taken
//! - The raw bytes are always kept; decoded trees are derived views
//! - Attributes and internal markers travel in `http::Extensions`

use axum::{
    body::Body,
    extract::{FromRequest, Multipart},
    http::{header, Extensions, HeaderMap, HeaderName, HeaderValue, Method, Request, Uri, Version},
};
use bytes::Bytes;
use serde_json::Value;

use crate::error::ProxyError;
use crate::http::form::{FormData, FormValue, UploadedFile};
use crate::http::query::{self, parse_nested};

pub const FORM_URLENCODED: &str = "application/x-www-form-urlencoded";
pub const MULTIPART_FORM_DATA: &str = "multipart/form-data";

/// Media types grouped by format name.
const FORMATS: &[(&str, &[&str])] = &[
    ("html", &["text/html", "application/xhtml+xml"]),
    ("txt", &["text/plain"]),
    ("js", &["application/javascript", "application/x-javascript", "text/javascript"]),
    ("css", &["text/css"]),
    ("json", &["application/json", "application/x-json"]),
    ("jsonld", &["application/ld+json"]),
    ("xml", &["text/xml", "application/xml", "application/x-xml"]),
    ("rdf", &["application/rdf+xml"]),
    ("atom", &["application/atom+xml"]),
    ("rss", &["application/rss+xml"]),
    ("form", &[FORM_URLENCODED, MULTIPART_FORM_DATA]),
];

/// A fully buffered client request.
#[derive(Debug, Clone)]
pub struct InboundRequest {
    method: Method,
    uri: Uri,
    version: Version,
    headers: HeaderMap,
    extensions: Extensions,
    body: Bytes,
    params: FormData,
    files: FormData,
}

impl InboundRequest {
    /// Creates an empty request. Mostly useful in tests.
    pub fn new(method: Method, uri: Uri) -> Self {
        Self {
            method,
            uri,
            version: Version::HTTP_11,
            headers: HeaderMap::new(),
            extensions: Extensions::new(),
            body: Bytes::new(),
            params: FormData::new(),
            files: FormData::new(),
        }
    }

    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.append(name, value);
        self
    }

    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    pub fn with_params(mut self, params: FormData) -> Self {
        self.params = params;
        self
    }

    pub fn with_files(mut self, files: FormData) -> Self {
        self.files = files;
        self
    }

    /// Buffers an axum request and decodes its body.
    ///
    /// Bodies larger than `body_limit` are rejected.
    pub async fn from_request(request: Request<Body>, body_limit: usize) -> Result<Self, ProxyError> {
        let (parts, body) = request.into_parts();
        let bytes = axum::body::to_bytes(body, body_limit)
            .await
            .map_err(|_| ProxyError::PayloadTooLarge(body_limit))?;

        let mut inbound = Self {
            method: parts.method,
            uri: parts.uri,
            version: parts.version,
            headers: parts.headers,
            extensions: parts.extensions,
            body: bytes,
            params: FormData::new(),
            files: FormData::new(),
        };

        match inbound.mime_essence().as_deref() {
            Some(FORM_URLENCODED) => {
                inbound.params = parse_nested(
                    url::form_urlencoded::parse(&inbound.body)
                        .map(|(k, v)| (k.into_owned(), v.into_owned())),
                );
            }
            Some(MULTIPART_FORM_DATA) => inbound.decode_multipart().await?,
            _ => {}
        }

        Ok(inbound)
    }

    async fn decode_multipart(&mut self) -> Result<(), ProxyError> {
        let mut builder = Request::builder();
        if let Some(content_type) = self.headers.get(header::CONTENT_TYPE) {
            builder = builder.header(header::CONTENT_TYPE, content_type.clone());
        }
        let mut request = builder
            .body(Body::from(self.body.clone()))
            .map_err(|e| ProxyError::Internal(e.to_string()))?;
        // carries the DefaultBodyLimit set on the router
        *request.extensions_mut() = self.extensions.clone();

        let mut multipart = Multipart::from_request(request, &())
            .await
            .map_err(|e| ProxyError::BadRequest(e.body_text()))?;

        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| ProxyError::BadRequest(e.body_text()))?
        {
            let name = match field.name() {
                Some(name) if !name.is_empty() => name.to_string(),
                _ => continue,
            };

            let file_name = field.file_name().map(str::to_string);
            match file_name {
                Some(file_name) => {
                    let content_type = field.content_type().map(str::to_string);
                    let data = field
                        .bytes()
                        .await
                        .map_err(|e| ProxyError::BadRequest(e.body_text()))?;
                    let file = UploadedFile {
                        file_name,
                        content_type,
                        data,
                    };
                    query::insert(&mut self.files, &name, FormValue::File(file));
                }
                None => {
                    let text = field
                        .text()
                        .await
                        .map_err(|e| ProxyError::BadRequest(e.body_text()))?;
                    query::insert(&mut self.params, &name, FormValue::Text(text));
                }
            }
        }

        Ok(())
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn uri(&self) -> &Uri {
        &self.uri
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    pub fn extensions(&self) -> &Extensions {
        &self.extensions
    }

    pub fn extensions_mut(&mut self) -> &mut Extensions {
        &mut self.extensions
    }

    /// Raw body bytes as received.
    pub fn body(&self) -> &Bytes {
        &self.body
    }

    /// Decoded body parameters.
    pub fn params(&self) -> &FormData {
        &self.params
    }

    /// Uploaded files.
    pub fn files(&self) -> &FormData {
        &self.files
    }

    /// Decoded query string.
    pub fn query(&self) -> FormData {
        self.uri.query().map(query::parse_query).unwrap_or_default()
    }

    /// The raw `content-type` header, if present and valid UTF-8.
    pub fn content_type(&self) -> Option<&str> {
        self.headers
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
    }

    /// Format name of the content type, e.g. `json` or `form`.
    pub fn content_type_format(&self) -> Option<&'static str> {
        let essence = self.mime_essence()?;
        FORMATS
            .iter()
            .find(|(_, types)| types.contains(&essence.as_str()))
            .map(|(format, _)| *format)
    }

    /// Media type without parameters: the text before the first `;`, trimmed.
    fn mime_essence(&self) -> Option<String> {
        let essence = self.content_type()?.split(';').next()?.trim();
        (!essence.is_empty()).then(|| essence.to_ascii_lowercase())
    }

    /// Decoded payload: the body parameters when any were decoded,
    /// otherwise the body parsed as JSON.
    pub fn payload(&self) -> Result<Value, ProxyError> {
        if !self.params.is_empty() {
            return serde_json::to_value(&self.params).map_err(ProxyError::Encoding);
        }

        if self.body.is_empty() {
            return Ok(Value::Object(serde_json::Map::new()));
        }

        match serde_json::from_slice::<Value>(&self.body) {
            Ok(value @ (Value::Object(_) | Value::Array(_))) => Ok(value),
            Ok(_) => Err(ProxyError::BadRequest(
                "JSON content was expected to decode to an object or array.".to_string(),
            )),
            Err(e) => Err(ProxyError::BadRequest(format!(
                "Could not decode request body: {}",
                e
            ))),
        }
    }

    /// Rebuilds an axum request carrying the buffered body.
    pub fn into_http(self) -> Request<Body> {
        let mut request = Request::new(Body::from(self.body));
        *request.method_mut() = self.method;
        *request.uri_mut() = self.uri;
        *request.version_mut() = self.version;
        *request.headers_mut() = self.headers;
        *request.extensions_mut() = self.extensions;
        request
    }

    pub(crate) fn set_uri(&mut self, uri: Uri) {
        self.uri = uri;
    }
}
