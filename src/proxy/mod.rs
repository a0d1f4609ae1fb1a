//! Forwarding engine.
//!
//! # Data Flow
//! ```text
//! (upstream, route, InboundRequest)
//!     → controller.rs (BffProxy)
//!         local name matches?  → local.rs (LocalProxy → RouteMatcher → SubRequestHandler)
//!         otherwise            → upstream lookup → path normalization → AccessGate
//!                              → remote.rs (RemoteProxy → ModifierChain → HttpClient)
//!                              → x-bff-proxy-upstream response header
//! ```
//!
//! # Design Decisions
//! - Local dispatch is checked first and bypasses the upstream lookup
//! - The gate only guards remote upstreams
//! - Exactly one outbound call per request, no retries

pub mod controller;
pub mod local;
pub mod remote;

pub use controller::{BffProxy, UPSTREAM_HEADER};
pub use local::LocalProxy;
pub use remote::RemoteProxy;

/// Prepends `/` unless the path already starts with one.
pub fn normalize_path(path: &str) -> String {
    if path.starts_with('/') {
        path.to_string()
    } else {
        format!("/{}", path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_path_is_idempotent() {
        assert_eq!(normalize_path("x"), "/x");
        assert_eq!(normalize_path("/x"), "/x");
        assert_eq!(normalize_path(&normalize_path("a/b")), "/a/b");
        assert_eq!(normalize_path(""), "/");
    }
}
