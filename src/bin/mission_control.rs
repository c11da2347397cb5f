//! Mission Control - HTTP control plane for OpenClaw agents.

use anyhow::Context;
use clap::Parser;
use mission_control::api::{build_router, AppState};
use mission_control::config::{apply_env_overrides, load_config, load_config_from_path, validate_config};
use mission_control::logging::init_tracing;
use std::net::SocketAddr;
use std::path::PathBuf;
use tracing::{error, info, warn};

// ---- CLI ----

#[derive(Parser)]
#[command(name = "mission-control", version, about = "Mission Control for OpenClaw agents")]
struct Args {
    /// Bind address (overrides MC_BIND)
    #[arg(long)]
    bind: Option<String>,

    /// Port (overrides MC_PORT)
    #[arg(long, short)]
    port: Option<u16>,

    /// Config file (defaults to the user config directory)
    #[arg(long, short)]
    config: Option<PathBuf>,

    /// OpenClaw Gateway WebSocket URL (overrides OPENCLAW_GATEWAY_URL)
    #[arg(long)]
    gateway_url: Option<String>,
}

// ---- Main ----

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Load config: defaults < file < env < flags
    let mut config = match &args.config {
        Some(path) => {
            let mut config = load_config_from_path(path)?;
            apply_env_overrides(&mut config)?;
            config
        }
        None => load_config()?,
    };
    if let Some(bind) = args.bind {
        config.server.bind = bind;
    }
    if let Some(port) = args.port {
        config.server.port = port;
    }
    if let Some(url) = args.gateway_url {
        config.gateway.url = url;
    }

    init_tracing(&config.log)?;
    info!("Starting Mission Control v{}", mission_control::VERSION);

    let validation = validate_config(&config);
    for issue in &validation.warnings {
        warn!("[config] {}", issue);
    }
    if !validation.valid {
        for issue in &validation.errors {
            error!("[config] {}", issue);
        }
        anyhow::bail!("Invalid configuration ({} errors)", validation.errors.len());
    }

    info!(
        gateway = %config.gateway.url,
        projects = %config.files.projects_path.display(),
        auth = config.auth.is_enabled(),
        "Configuration loaded"
    );

    let state = AppState::new(&config);
    let registry = state.registry.clone();
    let app = build_router(state);

    // Bind and serve
    let addr: SocketAddr = format!("{}:{}", config.server.bind, config.server.port)
        .parse()
        .with_context(|| format!("Invalid bind address {}:{}", config.server.bind, config.server.port))?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!("Mission Control listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    registry.get_client().disconnect().await;
    info!("Mission Control stopped");

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
