//! Backend-for-frontend request forwarding engine.

pub mod config;
pub mod error;
pub mod health;
pub mod http;
pub mod modifier;
pub mod observability;
pub mod proxy;
pub mod routing;
pub mod security;
pub mod upstream;

pub use config::BffConfig;
pub use error::ProxyError;
pub use http::{HttpServer, InboundRequest};
pub use proxy::{BffProxy, LocalProxy, RemoteProxy, UPSTREAM_HEADER};
