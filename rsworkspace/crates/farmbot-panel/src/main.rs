use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use farmbot_nats::{connect, shutdown};
use farmbot_panel::nats_impls::get_or_create_snapshot_bucket;
use farmbot_panel::{
    AppState, CommandChannel, CommandResponder, ConfigStore, LocalBackend, PanelConfig,
    RemoteBackend, SnapshotCache, router, serve,
};
use farmbot_std::SystemFs;
use farmbot_std::env::SystemEnv;
use tracing::{info, warn};

/// Farmbot control panel
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    mode: Mode,

    /// HTTP port (overrides PANEL_PORT)
    #[arg(long, global = true)]
    port: Option<u16>,

    /// User whose config is served (overrides PANEL_USER_ID)
    #[arg(long, global = true)]
    user_id: Option<String>,
}

#[derive(Subcommand, Debug, Clone, Copy)]
enum Mode {
    /// Edit config files on this host directly
    Local,
    /// Read the bot's snapshot and send it commands over NATS
    Remote,
    /// Bot side: apply panel commands to the config file and publish snapshots
    Responder,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let mut config = PanelConfig::from_env(&SystemEnv);
    if let Some(port) = cli.port {
        config.port = port;
    }
    if let Some(user_id) = cli.user_id {
        config.user_id = Some(user_id);
    }

    info!(mode = ?cli.mode, base_dir = %config.base_dir.display(), "Starting farmbot panel");

    match cli.mode {
        Mode::Local => run_local(config).await,
        Mode::Remote => run_remote(config).await,
        Mode::Responder => run_responder(config).await,
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to listen for Ctrl-C");
    }
    info!("Shutdown requested");
}

async fn run_local(config: PanelConfig) -> Result<()> {
    let backend = LocalBackend::new(ConfigStore::new(SystemFs, config.base_dir.clone()));
    let app = router(
        AppState::new(backend, config.user_id.clone())
            .with_idle_timeout(config.session_idle_timeout),
    );
    serve(app, config.port, shutdown_signal())
        .await
        .context("HTTP server failed")
}

async fn run_remote(config: PanelConfig) -> Result<()> {
    let nats = connect(&config.nats)
        .await
        .context("Failed to connect to NATS")?;
    let js = async_nats::jetstream::new(nats.clone());
    let kv = get_or_create_snapshot_bucket(&js, &config.kv_bucket)
        .await
        .context("Failed to open snapshot bucket")?;

    let backend = RemoteBackend::new(
        CommandChannel::new(nats.clone(), config.response_timeout),
        SnapshotCache::new(kv),
    );
    let app = router(
        AppState::new(backend, config.user_id.clone())
            .with_idle_timeout(config.session_idle_timeout),
    );
    let served = serve(app, config.port, shutdown_signal())
        .await
        .context("HTTP server failed");

    shutdown(&nats).await;
    served
}

async fn run_responder(config: PanelConfig) -> Result<()> {
    let user_id = config
        .user_id
        .clone()
        .context("PANEL_USER_ID or --user-id is required for the responder")?;
    farmbot_panel::store::validate_user_id(&user_id)?;

    let nats = connect(&config.nats)
        .await
        .context("Failed to connect to NATS")?;
    let js = async_nats::jetstream::new(nats.clone());
    let kv = get_or_create_snapshot_bucket(&js, &config.kv_bucket)
        .await
        .context("Failed to open snapshot bucket")?;

    let responder = CommandResponder::new(
        nats.clone(),
        ConfigStore::new(SystemFs, config.base_dir.clone()),
        SnapshotCache::new(kv),
        user_id,
    );
    let result = responder.run(shutdown_signal()).await;

    shutdown(&nats).await;
    result.context("Responder failed")
}
