//! Edge function registry (development server)
//!
//! Runs the registry for one project and serves the inspector API.
//!
//! # Architecture Overview
//!
//! ```text
//!   edge.toml ──┐      ┌───────────────────────────────────────────────┐
//!               │      │                   REGISTRY                     │
//!   project ────┼─────▶│  watch ──▶ actor ──▶ collector ──▶ scheduler   │
//!   files       │      │              │                        │        │
//!               │      │              ▼                        ▼        │
//!               │      │           events               RouteSnapshot   │
//!               │      └──────────────────────────────────────┬────────┘
//!               │                                             │
//!               │      ┌─────────────────┐                    │
//!               └─────▶│ inspector (axum)│◀───────────────────┘
//!                      └─────────────────┘
//! ```

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tokio::net::TcpListener;

use edge_registry::config::{load_config_or_default, DEFAULT_CONFIG_FILE};
use edge_registry::lifecycle::signals;
use edge_registry::observability::{logging, metrics};
use edge_registry::{Collaborators, InspectorServer, Registry, RegistryOptions, Shutdown};

#[derive(Parser)]
#[command(name = "edge-registry")]
#[command(about = "Serve a live edge function registry for local development", long_about = None)]
struct Args {
    /// Project directory
    #[arg(short, long, default_value = ".")]
    project_dir: PathBuf,

    /// Configuration file, relative to the project directory
    #[arg(short, long, default_value = DEFAULT_CONFIG_FILE)]
    config: PathBuf,

    /// Disable file watching
    #[arg(long)]
    no_watch: bool,

    /// Override the inspector bind address
    #[arg(long)]
    inspector_address: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let config_path = if args.config.is_absolute() {
        args.config.clone()
    } else {
        args.project_dir.join(&args.config)
    };
    let config = load_config_or_default(&config_path)?;

    logging::init_tracing(&config.dev.log_level);
    tracing::info!("edge-registry v{} starting", env!("CARGO_PKG_VERSION"));

    tracing::info!(
        config = %config_path.display(),
        declarations = config.edge_functions.len(),
        functions_dirs = ?config.dev.functions_dirs,
        "Configuration loaded"
    );

    if config.dev.metrics_enabled {
        match config.dev.metrics_address.parse::<SocketAddr>() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.dev.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let inspector_address = args
        .inspector_address
        .unwrap_or_else(|| config.dev.inspector_address.clone());
    let collaborators = Collaborators::from_config(&args.project_dir, &config.dev);
    let options = RegistryOptions::new(&args.project_dir, config)
        .with_config_path(&args.config)
        .with_watch(!args.no_watch);

    let registry = Arc::new(Registry::start(options, collaborators).await?);

    let shutdown = Shutdown::new();
    let mut stop = shutdown.subscribe();
    signals::spawn_shutdown_listener(shutdown.clone());

    #[cfg(unix)]
    {
        let reload = registry.clone();
        signals::spawn_hangup_listener(&shutdown, move || {
            if let Err(e) = reload.trigger(edge_registry::Intent::ConfigChanged) {
                tracing::error!(error = %e, "Failed to queue configuration reload");
            }
        })?;
    }

    let listener = TcpListener::bind(&inspector_address).await?;
    let server = InspectorServer::new(registry.clone());
    let server_task = tokio::spawn(server.run(listener, shutdown.clone()));

    let ready = tokio::select! {
        ready = registry.initialize() => Some(ready),
        _ = stop.recv() => None,
    };
    if let Some(ready) = ready {
        ready?;
        let status = registry.status();
        tracing::info!(
            functions = status.functions.len(),
            routes = status.routes,
            "Edge function registry ready"
        );
        let _ = stop.recv().await;
    }

    registry.shutdown();
    registry.stopped().await;
    server_task.await??;

    tracing::info!("Shutdown complete");
    Ok(())
}
