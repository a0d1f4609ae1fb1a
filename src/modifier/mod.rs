//! Request modifier chain.
//!
//! # Data Flow
//! ```text
//! InboundRequest + outbound skeleton (method, uri, passthrough headers)
//!     → ModifierChain::apply
//!         - Json            (format "json": re-serialized payload)
//!         - FormUrlEncoded  (exactly application/x-www-form-urlencoded)
//!         - FormData        (other "form" types: rebuilt multipart body)
//!         - Generic         (always: raw bytes)
//!     → outbound request with content-type and body
//! ```
//!
//! # Design Decisions
//! - First match wins, tested strictly in chain order
//! - The default chain ends with `Generic`, so it is total
//! - Modifiers are stateless enum variants, not trait objects

mod form_data;
mod form_urlencoded;
mod generic;
mod json;

use axum::{body::Body, http::Request};

use crate::error::ProxyError;
use crate::http::InboundRequest;
use crate::upstream::UpstreamConfig;

/// A strategy rebuilding the outbound body from the inbound request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestModifier {
    Json,
    FormUrlEncoded,
    FormData,
    Generic,
}

impl RequestModifier {
    pub fn name(&self) -> &'static str {
        match self {
            RequestModifier::Json => "json",
            RequestModifier::FormUrlEncoded => "form_urlencoded",
            RequestModifier::FormData => "form_data",
            RequestModifier::Generic => "generic",
        }
    }

    pub fn supports(&self, request: &InboundRequest) -> bool {
        match self {
            RequestModifier::Json => json::supports(request),
            RequestModifier::FormUrlEncoded => form_urlencoded::supports(request),
            RequestModifier::FormData => form_data::supports(request),
            RequestModifier::Generic => true,
        }
    }

    pub fn transform(
        &self,
        request: &InboundRequest,
        outbound: Request<Body>,
        config: &UpstreamConfig,
    ) -> Result<Request<Body>, ProxyError> {
        match self {
            RequestModifier::Json => json::transform(request, outbound, config),
            RequestModifier::FormUrlEncoded => form_urlencoded::transform(request, outbound, config),
            RequestModifier::FormData => form_data::transform(request, outbound, config),
            RequestModifier::Generic => generic::transform(request, outbound, config),
        }
    }
}

/// Ordered list of modifiers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModifierChain {
    modifiers: Vec<RequestModifier>,
}

impl ModifierChain {
    pub fn new(modifiers: Vec<RequestModifier>) -> Self {
        Self { modifiers }
    }

    pub fn modifiers(&self) -> &[RequestModifier] {
        &self.modifiers
    }

    /// First modifier supporting the request.
    pub fn select(&self, request: &InboundRequest) -> Option<RequestModifier> {
        self.modifiers.iter().copied().find(|m| m.supports(request))
    }

    pub fn apply(
        &self,
        request: &InboundRequest,
        outbound: Request<Body>,
        config: &UpstreamConfig,
    ) -> Result<Request<Body>, ProxyError> {
        let modifier = self.select(request).ok_or_else(|| {
            ProxyError::Internal(format!(
                "No request modifier supports content type {:?}.",
                request.content_type()
            ))
        })?;

        tracing::debug!(modifier = modifier.name(), "Request modifier selected");
        modifier.transform(request, outbound, config)
    }
}

impl Default for ModifierChain {
    fn default() -> Self {
        Self::new(vec![
            RequestModifier::Json,
            RequestModifier::FormUrlEncoded,
            RequestModifier::FormData,
            RequestModifier::Generic,
        ])
    }
}
