use std::sync::Arc;

use clap::Parser;
use mirrorhook::config::{Cli, Config, resolve_paths};
use mirrorhook::credentials::StoredCredentials;
use mirrorhook::db::Database;
use mirrorhook::handler::{AppState, router};
use mirrorhook::integrations::Integrations;
use mirrorhook::notify::NotifyService;
use mirrorhook::upstream::build_http_client;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    let args = Cli::parse();
    let (config_path, data_dir) = resolve_paths(args.config_path.as_deref());

    if let Err(e) = std::fs::create_dir_all(&data_dir) {
        eprintln!("failed to create data directory {:?}: {}", data_dir, e);
        std::process::exit(1);
    }

    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .json()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();
    tracing::info!("mirrorhook.svc starting");

    let cfg = Config::new(&config_path.to_string_lossy()).unwrap_or_else(|e| {
        tracing::error!(error = %e, path = ?config_path, "failed to load config file");
        std::process::exit(1);
    });
    let db = Arc::new(Database::new(&cfg, &data_dir).await.unwrap_or_else(|e| {
        tracing::error!(error = %e, "failed to setup database");
        std::process::exit(1);
    }));
    let http = build_http_client(cfg.upstream.timeout_seconds).unwrap_or_else(|e| {
        tracing::error!(error = %e, "failed to setup upstream http client");
        std::process::exit(1);
    });
    let integrations = Integrations::builtin(cfg.integrations.enabled.as_deref()).unwrap_or_else(|e| {
        tracing::error!(error = %e, "failed to register integrations");
        std::process::exit(1);
    });
    if integrations.is_empty() {
        tracing::warn!("no integrations enabled, notifications will only update stored locations");
    } else {
        tracing::info!(integrations = ?integrations.names(), "integrations registered");
    }

    let credentials = Arc::new(StoredCredentials::new(db.clone(), http, &cfg.upstream.base_url));
    let notify = Arc::new(NotifyService::new(db, credentials, integrations));
    let app = router(AppState { notify });

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
        shutdown_token.cancel();
    });

    tracing::info!("mirrorhook.svc running on {}", &address);
    if let Err(err) = axum::serve(listener, app)
        .with_graceful_shutdown(cancellation_token.cancelled_owned())
        .await
    {
        tracing::error!(error = %err, "server terminated with error");
        std::process::exit(1);
    }

    tracing::info!("mirrorhook.svc going off, graceful shutdown complete");
}
