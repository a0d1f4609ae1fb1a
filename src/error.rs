//! Error types for the forwarding engine.

use axum::{
    http::{header, HeaderValue, Method, StatusCode},
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::security::AccessDecision;
use crate::upstream::TransportError;

/// Every failure a single proxied request can end in.
#[derive(Error, Debug)]
pub enum ProxyError {
    #[error("The upstream \"{0}\" has no configuration defined.")]
    UpstreamNotFound(String),

    #[error("Access denied to route \"{route}\" of upstream \"{upstream}\".")]
    Forbidden {
        upstream: String,
        route: String,
        decision: AccessDecision,
    },

    #[error("{0}")]
    BadRequest(String),

    #[error("Request body exceeds the limit of {0} bytes.")]
    PayloadTooLarge(usize),

    #[error("No route found for \"{0}\".")]
    NotFound(String),

    #[error("No route found for \"{path}\": method not allowed (allow: {}).", join_methods(.allowed))]
    MethodNotAllowed { path: String, allowed: Vec<Method> },

    #[error("Failed to encode request body: {0}")]
    Encoding(#[source] serde_json::Error),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error(transparent)]
    Transport(#[from] TransportError),
}

fn join_methods(methods: &[Method]) -> String {
    methods
        .iter()
        .map(Method::as_str)
        .collect::<Vec<_>>()
        .join(", ")
}

impl ProxyError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ProxyError::UpstreamNotFound(_) => StatusCode::NOT_FOUND,
            ProxyError::Forbidden { .. } => StatusCode::FORBIDDEN,
            ProxyError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ProxyError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            ProxyError::NotFound(_) => StatusCode::NOT_FOUND,
            ProxyError::MethodNotAllowed { .. } => StatusCode::METHOD_NOT_ALLOWED,
            ProxyError::Encoding(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ProxyError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ProxyError::Transport(_) => StatusCode::BAD_GATEWAY,
        }
    }
}

impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        // upstream and server side details stay in the logs
        let message = match &self {
            ProxyError::Transport(e) => {
                tracing::error!(error = %e, "Upstream request failed");
                "Upstream request failed".to_string()
            }
            ProxyError::Encoding(_) | ProxyError::Internal(_) => {
                tracing::error!(error = %self, "Proxy error");
                "Internal server error".to_string()
            }
            ProxyError::Forbidden { decision, .. } => {
                tracing::warn!(error = %self, votes = ?decision.votes(), "Proxy access denied");
                self.to_string()
            }
            _ => self.to_string(),
        };

        let mut response = (status, message).into_response();
        if let ProxyError::MethodNotAllowed { allowed, .. } = &self {
            if let Ok(value) = HeaderValue::from_str(&join_methods(allowed)) {
                response.headers_mut().insert(header::ALLOW, value);
            }
        }
        response
    }
}
