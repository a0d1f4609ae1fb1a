//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! proxy::controller
//!     → logging.rs (structured log events, tracing-subscriber)
//!     → metrics.rs (request counter and latency histogram)
//!
//! Consumers:
//!     → stdout (pretty or JSON)
//!     → Metrics endpoint (Prometheus scrape)
//! ```
//!
//! # Design Decisions
//! - JSON output is opt-in through `observability.json_logs`
//! - Request ID flows through the tower-http request-id layers
//! - One counter increment and one histogram sample per proxied request

pub mod logging;
pub mod metrics;
