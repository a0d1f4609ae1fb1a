//! bff-proxy
//!
//! Backend-for-frontend gateway built with Tokio and Axum.
//!
//! # Architecture Overview
//!
//! ```text
//!     Client Request
//!     ──────────────▶ http server ──▶ BffProxy ──┬──▶ LocalProxy ──▶ in-process router
//!                     {prefix}/{upstream}/{*route}│
//!                                                 └──▶ gate ──▶ RemoteProxy ──▶ modifiers ──▶ upstream
//!
//!     Cross-cutting: config, observability (tracing + metrics), security gate
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tokio::net::TcpListener;

use bff_proxy::config::{load_config, BffConfig};
use bff_proxy::health;
use bff_proxy::http::HttpServer;
use bff_proxy::modifier::ModifierChain;
use bff_proxy::observability::{logging, metrics};
use bff_proxy::proxy::{BffProxy, RemoteProxy};
use bff_proxy::security::AffirmativeGate;
use bff_proxy::upstream::build_upstreams;

#[derive(Parser, Debug)]
#[command(name = "bff-proxy", version, about = "Backend-for-frontend request forwarding gateway")]
struct Cli {
    /// Path to the TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override server.bind_address
    #[arg(short, long)]
    bind: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => load_config(path)?,
        None => BffConfig::default(),
    };
    if let Some(bind) = cli.bind {
        config.server.bind_address = bind;
    }

    logging::init_tracing(&config.observability)?;

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "bff-proxy starting");
    tracing::info!(
        bind_address = %config.server.bind_address,
        route_prefix = %config.server.route_prefix,
        upstreams = config.upstreams.len(),
        local_proxy = ?config.proxy.local_proxy,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => {
                if let Err(e) = metrics::init_metrics(addr) {
                    tracing::error!(error = %e, "Failed to start metrics exporter");
                }
            }
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let upstreams = build_upstreams(&config.upstreams)?;
    let remote = RemoteProxy::new(config.proxy.options_parameter.clone(), ModifierChain::default());
    let mut proxy = BffProxy::new(remote, upstreams).with_gate(Arc::new(AffirmativeGate::default()));
    if let Some(name) = &config.proxy.local_proxy {
        let local = health::local_proxy(name.clone());
        tracing::info!(local_proxy = local.name(), "Local upstream enabled");
        proxy = proxy.with_local(local);
    }

    let listener = TcpListener::bind(&config.server.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let server = HttpServer::new(Arc::new(proxy), &config.server);
    server.run(listener).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
