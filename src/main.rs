//! Service gateway.
//!
//! # Architecture Overview
//!
//! ```text
//!     Client Request
//!     ──────────────▶ http::server (request ID, tracing, timeout)
//!                         │
//!                         ▼
//!                     dispatch::Dispatcher ── RouteTable lookup (method + path)
//!                         │
//!                         ▼
//!                     behaviours: rate limiting → authentication → caching
//!                         │
//!                         ▼
//!                     proxy::HostRewriter (client path → upstream URL)
//!                         │
//!                         ▼
//!                     proxy::HttpProxy ─────────────────────────────────▶ Backend
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tokio::net::TcpListener;

use service_gateway::config::loader::load_config;
use service_gateway::lifecycle::signals::shutdown_on_signal;
use service_gateway::observability::{logging, metrics};
use service_gateway::{build_gateway, GatewayServer, HttpProxy, Shutdown};

#[derive(Parser)]
#[command(name = "service-gateway")]
#[command(about = "API gateway dispatching requests to backend applications", long_about = None)]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(short, long, default_value = "gateway.toml")]
    config: PathBuf,

    /// Override `listener.bind_address`.
    #[arg(short, long)]
    bind: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut config = load_config(&cli.config)?;
    if let Some(bind) = cli.bind {
        config.listener.bind_address = bind;
    }

    logging::init_logging(&config.observability)?;
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "service-gateway starting");
    tracing::info!(
        config = %cli.config.display(),
        bind_address = %config.listener.bind_address,
        dispatching_mode = %config.dispatching_mode,
        applications = config.applications.len(),
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr)?,
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let config = Arc::new(config);
    let proxy = Arc::new(HttpProxy::new(&config.proxy));
    let router = build_gateway(Arc::clone(&config), proxy)?;

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let shutdown = Shutdown::new();
    tokio::spawn(shutdown_on_signal(shutdown.clone()));

    GatewayServer::new(router, &config).run(listener, shutdown).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
