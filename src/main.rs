use std::net::SocketAddr;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use tokio::net::TcpListener;
use tokio::signal;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use voterflow_portal_adapter::PortalConfig;
use voterflow_server::{build_router, build_state, AppConfig};

#[derive(Parser)]
#[command(name = "voterflow", version, about = "Conversational voter registration assistant")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the HTTP server.
    Serve(ServeArgs),
}

#[derive(Args)]
struct ServeArgs {
    /// Bind address, e.g. 127.0.0.1:3001
    #[arg(long)]
    bind: Option<SocketAddr>,

    /// Base URL of the voter portal
    #[arg(long = "portal-url")]
    portal_url: Option<String>,

    /// Run the browser with a visible window
    #[arg(long, default_value_t = false)]
    headed: bool,

    /// Persist memories and transcripts under this directory
    #[arg(long = "storage-dir")]
    storage_dir: Option<std::path::PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();
    match cli.command {
        Command::Serve(args) => serve(args).await,
    }
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

async fn serve(args: ServeArgs) -> Result<()> {
    let mut config = AppConfig::from_env()?;
    if let Some(bind) = args.bind {
        config.bind = bind;
    }
    if let Some(dir) = args.storage_dir {
        config.storage_dir = Some(dir);
    }

    let mut portal_config = PortalConfig::default();
    if let Some(url) = args.portal_url {
        portal_config.base_url = url;
    }
    if args.headed {
        portal_config.headless = false;
    }

    let state = build_state(&config, portal_config)?;
    let portal = state.portal.clone();
    let router = build_router(state);

    let listener = TcpListener::bind(config.bind)
        .await
        .with_context(|| format!("failed to bind {}", config.bind))?;
    info!(addr = %config.bind, "voterflow server listening");

    axum::serve(listener, router.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    portal.close().await;
    Ok(())
}

async fn shutdown_signal() {
    if signal::ctrl_c().await.is_ok() {
        info!("shutdown signal received");
    }
}
