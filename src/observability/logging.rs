//! Structured logging.
//!
//! # Design Decisions
//! - Uses the tracing crate for structured logging
//! - JSON format for production, pretty format for development
//! - `RUST_LOG` wins over the configured level

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::ObservabilityConfig;

/// Filter used when neither `RUST_LOG` nor a config level is set.
pub const DEFAULT_FILTER: &str = "bff_proxy=info,tower_http=info";

/// Builds the filter from `RUST_LOG`, then `log_level`, then [`DEFAULT_FILTER`].
pub fn env_filter(log_level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .or_else(|_| {
            if log_level.trim().is_empty() {
                EnvFilter::try_new(DEFAULT_FILTER)
            } else {
                EnvFilter::try_new(format!("bff_proxy={0},tower_http={0}", log_level.trim()))
            }
        })
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
}

/// Installs the global subscriber. Calling it twice is an error reported by
/// the returned result.
pub fn init_tracing(config: &ObservabilityConfig) -> Result<(), tracing_subscriber::util::TryInitError> {
    let registry = tracing_subscriber::registry().with(env_filter(&config.log_level));

    if config.json_logs {
        registry.with(tracing_subscriber::fmt::layer().json()).try_init()
    } else {
        registry.with(tracing_subscriber::fmt::layer()).try_init()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_from_level() {
        if std::env::var_os("RUST_LOG").is_some() {
            return;
        }
        assert!(env_filter("debug").to_string().contains("bff_proxy=debug"));
        assert!(env_filter("").to_string().contains("bff_proxy=info"));
    }

    #[test]
    fn test_invalid_level_falls_back() {
        if std::env::var_os("RUST_LOG").is_some() {
            return;
        }
        assert!(env_filter("not a level!").to_string().contains("bff_proxy=info"));
    }
}
