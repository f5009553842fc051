//! canvas-gateway binary.
//!
//! Loads configuration, applies the platform's environment overrides,
//! builds the gateway, and serves until a termination signal. The domain
//! operation registry is supplied by the embedding application; this binary
//! registers only a deployment smoke-test operation.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use serde_json::json;
use tokio::net::TcpListener;

use canvas_gateway::config::{self, GatewayConfig};
use canvas_gateway::lifecycle::{signals, Shutdown};
use canvas_gateway::observability;
use canvas_gateway::{GatewayServer, OperationRegistry};

#[derive(Debug, Parser)]
#[command(name = "canvas-gateway", about = "Transport-normalizing SSE gateway")]
struct Args {
    /// Path to the TOML configuration file. Defaults apply when omitted.
    #[arg(long)]
    config: Option<PathBuf>,
}

/// Platform deployments inject the listening port and public domain through
/// the environment; they win over the file.
fn apply_env_overrides(config: &mut GatewayConfig) {
    if let Ok(port) = std::env::var("PORT") {
        match (
            config.listener.bind_address.parse::<SocketAddr>(),
            port.parse::<u16>(),
        ) {
            (Ok(mut addr), Ok(port)) => {
                addr.set_port(port);
                config.listener.bind_address = addr.to_string();
            }
            _ => eprintln!("Ignoring unusable PORT override: {:?}", port),
        }
    }
    if let Ok(domain) = std::env::var("PUBLIC_DOMAIN") {
        config.proxy.public_domain = domain;
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => config::load_config(path)?,
        None => GatewayConfig::default(),
    };
    apply_env_overrides(&mut config);

    if let Err(errors) = config::validation::validate_config(&config) {
        for error in &errors {
            eprintln!("config error: {}", error);
        }
        eprintln!("\nPlease check your configuration and platform variables.");
        std::process::exit(1);
    }

    observability::logging::init(&config.observability.log_level);

    tracing::info!(
        service = %config.gateway.service_name,
        bind_address = %config.listener.bind_address,
        strategy = ?config.proxy.strategy,
        collision_policy = ?config.session.collision_policy,
        "configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => observability::metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "failed to parse metrics address"
            ),
        }
    }

    let mut registry = OperationRegistry::new();
    registry.register_fn("system.ping", |_| async {
        Ok(json!({ "pong": true }))
    });
    let mut operations = registry.names();
    operations.sort_unstable();
    tracing::info!(count = operations.len(), operations = ?operations, "operation registry ready");

    let listener = TcpListener::bind(&config.listener.bind_address).await?;

    let shutdown = Arc::new(Shutdown::new());
    signals::spawn_signal_listener(Arc::clone(&shutdown));

    let server = GatewayServer::new(config, registry);
    server.run(listener, &shutdown).await?;

    tracing::info!("shutdown complete");
    Ok(())
}
