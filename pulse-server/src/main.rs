mod cli;
mod watchlist;
mod ws;

use std::sync::Arc;

use axum::routing::get;
use axum::Router;
use clap::Parser;
use figment::providers::{Env, Format, Toml};
use figment::Figment;
use pulse_engine::Engine;
use pulse_sources::FastClient;
use pulse_types::{CallerTag, EngineConfig};
use tokio::net::TcpListener;

use crate::cli::Cli;
use crate::watchlist::{FileWatchlistStore, WatchlistStore};
use crate::ws::{ws_handler, AppState};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.log_level.as_deref());

    let config = match load_config(&cli) {
        Ok(config) => config,
        Err(e) => {
            tracing::error!(error = %e, "failed to load configuration");
            std::process::exit(1);
        }
    };

    let engine = Engine::new(config.clone());

    let watchlist_path = cli
        .watchlist
        .clone()
        .or_else(|| config.watchlist_path.clone().map(Into::into))
        .unwrap_or_else(|| "stocks.txt".into());
    let watchlist = FileWatchlistStore::new(watchlist_path);
    match watchlist.read_codes() {
        Ok(codes) if !codes.is_empty() => {
            tracing::info!(count = codes.len(), "seeded pool from watchlist file");
            engine.ingress.enqueue(codes, CallerTag::Bootstrap);
        }
        Ok(_) => {}
        Err(e) => tracing::warn!(error = %e, "failed to read watchlist file, starting with an empty pool"),
    }

    if let Err(e) = engine.start().await {
        tracing::error!(error = %e, "engine failed to start");
        std::process::exit(1);
    }
    tracing::info!("engine started");

    let fast: Arc<dyn pulse_core::UpstreamClient> = Arc::new(FastClient::new(config.data_sources["fast"].clone()));
    let state = AppState {
        ingress: engine.ingress.clone(),
        cache: Arc::clone(&engine.cache),
        gateway: Arc::clone(&engine.gateway),
        fast,
    };
    let app = Router::new().route("/stocks_realtime", get(ws_handler)).with_state(state);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = match TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!(%addr, error = %e, "failed to bind server address");
            engine.stop().await;
            std::process::exit(1);
        }
    };
    tracing::info!(%addr, "listening");

    if let Err(e) = axum::serve(listener, app).with_graceful_shutdown(shutdown_signal()).await {
        tracing::error!(error = %e, "server error");
    }

    engine.stop().await;
    tracing::info!("engine stopped, exiting");
}

fn load_config(cli: &Cli) -> Result<EngineConfig, figment::Error> {
    Figment::new()
        .merge(Toml::file(&cli.config))
        .merge(Env::prefixed("PULSE_").split("__"))
        .extract()
}

fn init_tracing(level_override: Option<&str>) {
    let filter = level_override
        .map(ToOwned::to_owned)
        .or_else(|| std::env::var("RUST_LOG").ok())
        .unwrap_or_else(|| "pulse_engine=info,pulse_server=info,warn".to_owned());
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

async fn shutdown_signal() {
    let ctrl_c = async {
        let _ = tokio::signal::ctrl_c().await;
    };

    #[cfg(unix)]
    let terminate = async {
        let Ok(mut signal) = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) else {
            return;
        };
        signal.recv().await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
    tracing::info!("shutdown signal received");
}
