//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Upstream names must be ASCII slugs usable as a path segment
//! - Base URLs must be absolute http(s) URLs
//! - Header names and limits must be usable
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is a pure function: BffConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::fmt;

use axum::http::HeaderName;
use url::Url;

use crate::config::schema::BffConfig;

/// A single semantic problem, located by its config path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

impl ValidationError {
    fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// `[A-Za-z0-9]+(-[A-Za-z0-9]+)*`
pub fn is_ascii_slug(name: &str) -> bool {
    !name.is_empty()
        && name
            .split('-')
            .all(|part| !part.is_empty() && part.bytes().all(|b| b.is_ascii_alphanumeric()))
}

pub fn validate_config(config: &BffConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if !config.server.route_prefix.starts_with('/') {
        errors.push(ValidationError::new("server.route_prefix", "must start with \"/\""));
    }
    if config.server.max_body_bytes == 0 {
        errors.push(ValidationError::new("server.max_body_bytes", "must be greater than 0"));
    }
    if config.server.request_timeout_secs == 0 {
        errors.push(ValidationError::new("server.request_timeout_secs", "must be greater than 0"));
    }

    if config.proxy.options_parameter.trim().is_empty() {
        errors.push(ValidationError::new("proxy.options_parameter", "must not be empty"));
    }
    if let Some(local) = &config.proxy.local_proxy {
        if !is_ascii_slug(local) {
            errors.push(ValidationError::new("proxy.local_proxy", "must be an ASCII slug"));
        }
    }

    for (name, upstream) in &config.upstreams {
        let field = |key: &str| format!("upstreams.{}.{}", name, key);

        if !is_ascii_slug(name) {
            errors.push(ValidationError::new(
                format!("upstreams.{}", name),
                "upstream name must be an ASCII slug",
            ));
        }

        match Url::parse(&upstream.base_url) {
            Ok(url) if matches!(url.scheme(), "http" | "https") && url.has_host() => {}
            Ok(_) => errors.push(ValidationError::new(
                field("base_url"),
                "must be an http or https URL with a host",
            )),
            Err(e) => errors.push(ValidationError::new(field("base_url"), e.to_string())),
        }

        if upstream.timeout_secs == Some(0) {
            errors.push(ValidationError::new(field("timeout_secs"), "must be greater than 0"));
        }

        for (key, names) in [
            ("passthrough_request_headers", &upstream.passthrough_request_headers),
            ("passthrough_response_headers", &upstream.passthrough_response_headers),
        ] {
            for header in names {
                if HeaderName::from_bytes(header.as_bytes()).is_err() {
                    errors.push(ValidationError::new(
                        field(key),
                        format!("invalid header name \"{}\"", header),
                    ));
                }
            }
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
