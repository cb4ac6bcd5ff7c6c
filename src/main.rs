use std::path::PathBuf;

use clap::Parser;
use shelf::app;
use shelf::config::{Cli, Config, default_config_dir, default_config_path};
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    let args = Cli::parse();
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .json()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();
    tracing::info!("shelf.svc starting");

    // With --config, data lives next to the config file. Otherwise both live
    // in ~/.shelf/ and a missing config file means built-in defaults.
    let (config_path, data_dir, explicit) = match args.config_path {
        Some(path) => {
            let path = PathBuf::from(path);
            let dir = path
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .map(|p| p.to_path_buf())
                .unwrap_or_else(|| PathBuf::from("."));
            (path, dir, true)
        }
        None => (default_config_path(), default_config_dir(), false),
    };

    if let Err(e) = std::fs::create_dir_all(&data_dir) {
        tracing::error!(error = %e, path = ?data_dir, "failed to create data directory");
        std::process::exit(1);
    }

    let cfg = if explicit || config_path.exists() {
        Config::new(&config_path.to_string_lossy()).unwrap_or_else(|e| {
            tracing::error!(error = %e, path = ?config_path, "failed to load config file");
            std::process::exit(1);
        })
    } else {
        tracing::info!(path = ?config_path, "no config file, using defaults");
        Config::default()
    };

    let app = app::build(&cfg, &data_dir).await.unwrap_or_else(|e| {
        tracing::error!(error = %e, "failed to open stores");
        std::process::exit(1);
    });

    let address = format!("0.0.0.0:{}", cfg.app.get_port());
    let listener = tokio::net::TcpListener::bind(&address).await.unwrap_or_else(|e| {
        tracing::error!(error = %e, "failed to setup tcp listener");
        std::process::exit(1);
    });

    let cancellation_token = CancellationToken::new();
    let shutdown_token = cancellation_token.clone();
    tokio::spawn(async move {
        if signal::ctrl_c().await.is_ok() {
            tracing::info!("ctrl+c signal received, preparing to shutdown");
        }
        cancellation_token.cancel();
    });

    tracing::info!("shelf.svc running on {}", &address);
    let served = axum::serve(listener, app)
        .with_graceful_shutdown(async move { shutdown_token.cancelled().await })
        .await;

    if let Err(err) = served {
        tracing::error!(error = %err, "server error");
        std::process::exit(1);
    }
    tracing::info!("shelf.svc going off, graceful shutdown complete");
}
