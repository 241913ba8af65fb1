//! Snapgate command-line entrypoint
//!
//! `snapgate serve` runs the HTTP surface; `snapgate issue-session` signs a
//! producer session for a uid handed over by the identity provider.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use snapgate_core::SnapgateConfig;
use snapgate_effects::Effects;
use snapgate_server::{router, AppState};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "snapgate")]
#[command(about = "Snapgate - password-gated snapshot hosting", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Config file path
    #[arg(short, long, global = true, default_value = "snapgate.toml")]
    config: PathBuf,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP server
    Serve {
        /// Listen address, overriding the configuration
        #[arg(short, long)]
        bind: Option<String>,
    },

    /// Print a producer session token for a uid
    IssueSession {
        /// Producer identity
        #[arg(short, long)]
        uid: String,
    },
}

fn load_config(path: &Path) -> Result<SnapgateConfig> {
    let mut config = if path.exists() {
        SnapgateConfig::load_from_file(path)
            .with_context(|| format!("loading {}", path.display()))?
    } else {
        warn!(path = %path.display(), "config file not found, using defaults");
        SnapgateConfig::default()
    };
    config.merge_with_env()?;
    config.validate().context("invalid configuration")?;
    Ok(config)
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!(error = %err, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("shutting down");
}

async fn serve(config: SnapgateConfig, bind: Option<String>) -> Result<()> {
    let state = AppState::from_config(&config, Effects::production())?;
    let addr: SocketAddr = bind
        .unwrap_or_else(|| config.bind_address.clone())
        .parse()
        .context("invalid bind address")?;

    info!(
        %addr,
        data_dir = %config.data_dir.display(),
        plan = ?config.default_plan,
        "starting snapgate"
    );
    let listener = TcpListener::bind(addr).await?;
    axum::serve(
        listener,
        router(state).into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_level = if cli.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let config = load_config(&cli.config)?;
    match cli.command {
        Commands::Serve { bind } => serve(config, bind).await?,
        Commands::IssueSession { uid } => {
            let state = AppState::from_config(&config, Effects::production())?;
            println!("{}", state.sessions.issue(&uid)?);
        }
    }
    Ok(())
}
