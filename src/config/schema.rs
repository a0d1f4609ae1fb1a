//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the gateway.
//! All types derive Serde traits for deserialization from config files.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::http::options::DEFAULT_OPTIONS_PARAMETER;

/// Root configuration for the gateway.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct BffConfig {
    /// Listener and inbound request limits.
    pub server: ServerConfig,

    /// Engine-wide forwarding settings.
    pub proxy: ProxySettings,

    /// Remote upstreams by name, in file order.
    pub upstreams: IndexMap<String, UpstreamSettings>,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,

    /// Mount point of the proxy route, `{route_prefix}/{upstream}/{*route}`.
    pub route_prefix: String,

    /// Largest inbound body accepted, in bytes.
    pub max_body_bytes: usize,

    /// Request timeout (total time for request/response) in seconds.
    pub request_timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
            route_prefix: "/bff-proxy".to_string(),
            max_body_bytes: 10 * 1024 * 1024,
            request_timeout_secs: 30,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ProxySettings {
    /// Reserved query parameter carrying gateway directives.
    pub options_parameter: String,

    /// Name under which the in-process upstream is reachable.
    pub local_proxy: Option<String>,
}

impl Default for ProxySettings {
    fn default() -> Self {
        Self {
            options_parameter: DEFAULT_OPTIONS_PARAMETER.to_string(),
            local_proxy: None,
        }
    }
}

/// Remote upstream definition.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct UpstreamSettings {
    /// Absolute base URL, e.g. "http://api.internal:8080/v1".
    pub base_url: String,

    /// Time allowed for the upstream to answer, in seconds.
    pub timeout_secs: Option<u64>,

    pub passthrough_request_x_headers: bool,

    /// Added to the default request passthrough list.
    pub passthrough_request_headers: Vec<String>,

    pub passthrough_response_x_headers: bool,

    /// Added to the default response passthrough list.
    pub passthrough_response_headers: Vec<String>,

    /// Forward uploaded files of multipart requests.
    pub support_file_upload: bool,
}

impl Default for UpstreamSettings {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            timeout_secs: None,
            passthrough_request_x_headers: true,
            passthrough_request_headers: Vec::new(),
            passthrough_response_x_headers: true,
            passthrough_response_headers: Vec::new(),
            support_file_upload: true,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Emit logs as JSON lines.
    pub json_logs: bool,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            json_logs: false,
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_file_uses_defaults() {
        let config: BffConfig = toml::from_str("").unwrap();
        assert_eq!(config.server.bind_address, "0.0.0.0:8080");
        assert_eq!(config.server.route_prefix, "/bff-proxy");
        assert_eq!(config.proxy.options_parameter, "bffProxy");
        assert!(config.proxy.local_proxy.is_none());
        assert!(config.upstreams.is_empty());
        assert!(!config.observability.metrics_enabled);
    }

    #[test]
    fn test_upstreams_keep_file_order() {
        let config: BffConfig = toml::from_str(
            r#"
            [proxy]
            local_proxy = "local"

            [upstreams.zeta]
            base_url = "http://zeta:80"
            support_file_upload = false

            [upstreams.alpha]
            base_url = "http://alpha:80"
            timeout_secs = 5
            passthrough_request_headers = ["Authorization"]
            "#,
        )
        .unwrap();

        assert_eq!(config.proxy.local_proxy.as_deref(), Some("local"));
        assert_eq!(config.upstreams.keys().collect::<Vec<_>>(), vec!["zeta", "alpha"]);

        let zeta = &config.upstreams["zeta"];
        assert!(!zeta.support_file_upload);
        assert!(zeta.passthrough_request_x_headers);

        let alpha = &config.upstreams["alpha"];
        assert_eq!(alpha.timeout_secs, Some(5));
        assert_eq!(alpha.passthrough_request_headers, vec!["Authorization"]);
    }
}
