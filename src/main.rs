use std::{
    env::Args,
    net::{Ipv4Addr, SocketAddr},
    sync::Arc,
};

use anyhow::Context;
use tokio::{net::TcpListener, sync::watch};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use uid_registry::{
    config::{Config, Parameter},
    notify::PanelNotifier,
    server,
    store::Store,
    sweep, AppState,
};

const ADDRESS: Ipv4Addr = Ipv4Addr::UNSPECIFIED;

/// Load config from command line arguments
fn parse_args(args: Args) -> anyhow::Result<Config> {
    let args = args.skip(1);

    let mut config = Config::default();
    let mut current_key = None;
    for arg in args {
        if let Some(current_key) = current_key.take() {
            config.0.insert(current_key, arg);
        } else if arg.starts_with("--") {
            current_key = Some(Parameter::deserialize(arg.strip_prefix("--").unwrap())?);
        } else {
            anyhow::bail!("invalid argument {:?}", arg)
        }
    }
    Ok(config)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = parse_args(std::env::args())?;
    let port = config.port()?;
    let interval = config.sweep_interval()?;
    let storage_file = config.storage_file();

    let store = Store::open(&storage_file)
        .with_context(|| format!("failed to open storage file {:?}", storage_file))?;
    let notifier = Arc::new(PanelNotifier::new(
        config.panel_add_url(),
        config.panel_remove_url(),
    ));
    let state = Arc::new(AppState { store, notifier });

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let sweeper = tokio::spawn(sweep::run(state.clone(), interval, shutdown_rx));

    let listener = TcpListener::bind(SocketAddr::from((ADDRESS, port))).await?;
    info!(port, storage_file = %storage_file.display(), "listening");
    axum::serve(listener, server::router(state))
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await?;

    info!("shutting down");
    let _ = shutdown_tx.send(true);
    sweeper.await?;
    Ok(())
}
