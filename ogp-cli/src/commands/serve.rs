use crate::api::{self, AppState};
use crate::config::CliConfig;
use clap::Args;
use ogp_core::{
    assets, AssetStoreKind, GameRegistry, GameTemplate, OgpClient, Result, ServerConfig, Storage,
};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::net::TcpListener;

#[derive(Args)]
pub struct ServeArgs {
    /// Port to listen on (overrides PORT)
    #[arg(short, long)]
    port: Option<u16>,
}

pub async fn handle_serve_command(
    args: ServeArgs,
    cli: &CliConfig,
    database: PathBuf,
) -> Result<()> {
    let mut config = ServerConfig::from_env(&cli.data_dir)?;
    if let Some(port) = args.port {
        config.port = port;
    }
    config.database_path = database;

    let storage = Arc::new(Storage::new(&config.database_path).await?);
    let platform = Arc::new(OgpClient::new(&config)?);
    let asset_store = assets::from_config(&config.assets, config.request_timeout)?;
    let template = GameTemplate::load(config.template_path.as_deref()).await?;

    let registry = Arc::new(GameRegistry::new(
        &config,
        platform,
        asset_store,
        storage,
        template,
    ));

    match registry.platform_user().await {
        Ok(user) => tracing::info!("Platform account {} ready", user.id),
        Err(e) => tracing::warn!("Could not reach the OGP platform yet: {}", e),
    }

    let assets_dir = match config.assets.kind {
        AssetStoreKind::Local => {
            tokio::fs::create_dir_all(&config.assets.local_dir).await?;
            Some(config.assets.local_dir.clone())
        }
        AssetStoreKind::Http => None,
    };

    let app = api::router(AppState { registry }, assets_dir.as_deref());

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = TcpListener::bind(addr).await?;
    tracing::info!("Listening on http://{}", addr);
    tracing::info!("Database: {}", config.database_path.display());

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutting down");
}
