//! Hive Server Binary
//!
//! Starts the HTTP server for Hive.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use hive::config::WalSyncStrategy;
use hive::{Config, Engine};
use tracing_subscriber::{fmt, EnvFilter};

/// Hive Server
#[derive(Parser, Debug)]
#[command(name = "hive-server")]
#[command(about = "Bitcask-style key-value store over HTTP")]
#[command(version)]
struct Args {
    /// Data directory (WAL and snapshot)
    #[arg(short, long, env = "STORAGE_PATH", default_value = "./data")]
    data_dir: PathBuf,

    /// Listen address (host:port)
    #[arg(short, long, env = "SERVER_ADDRESS", default_value = "0.0.0.0:8080")]
    listen: String,

    /// Seconds between background compactions (0 disables)
    #[arg(long, env = "HIVE_COMPACTION_INTERVAL_SECS", default_value_t = 90)]
    compaction_interval_secs: u64,

    /// Mutations that trigger a background compaction (0 disables)
    #[arg(long, env = "HIVE_COMPACTION_THRESHOLD", default_value_t = 30)]
    compaction_threshold: u64,

    /// fsync the WAL every N appends (1 = every write)
    #[arg(long, env = "HIVE_SYNC_EVERY", default_value_t = 1)]
    sync_every: usize,

    /// Keep a timestamped copy of each snapshot that compaction replaces
    #[arg(
        long,
        env = "HIVE_ARCHIVE_SNAPSHOTS",
        default_value_t = true,
        action = clap::ArgAction::Set
    )]
    archive_snapshots: bool,
}

impl Args {
    fn to_config(&self) -> Config {
        Config::builder()
            .data_dir(&self.data_dir)
            .listen_addr(&self.listen)
            .wal_sync_strategy(WalSyncStrategy::from_count(self.sync_every))
            .compaction_interval(
                Some(self.compaction_interval_secs)
                    .filter(|secs| *secs > 0)
                    .map(Duration::from_secs),
            )
            .compaction_threshold(Some(self.compaction_threshold).filter(|n| *n > 0))
            .archive_snapshots(self.archive_snapshots)
            .build()
    }
}

#[tokio::main]
async fn main() {
    // Initialize tracing/logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,hive=debug"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true)
        .init();

    let args = Args::parse();
    let config = args.to_config();

    tracing::info!("Hive Server v{}", hive::VERSION);
    tracing::info!("Data directory: {}", config.data_dir.display());
    tracing::info!("Listen address: {}", config.listen_addr);

    // Open engine
    let engine = match Engine::open(config.clone()) {
        Ok(e) => Arc::new(e),
        Err(e) => {
            tracing::error!("Failed to open engine: {}", e);
            std::process::exit(1);
        }
    };

    tracing::info!("Engine initialized successfully");

    let listener = match tokio::net::TcpListener::bind(&config.listen_addr).await {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!("Failed to bind {}: {}", config.listen_addr, e);
            std::process::exit(1);
        }
    };

    let app = hive::http::router(Arc::clone(&engine));
    if let Err(e) = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
    {
        tracing::error!("Server error: {}", e);
    }

    match Arc::try_unwrap(engine) {
        Ok(engine) => {
            if let Err(e) = engine.close() {
                tracing::error!("Failed to close engine: {}", e);
                std::process::exit(1);
            }
        }
        Err(_) => tracing::warn!("Engine still in use at shutdown, skipping close"),
    }

    tracing::info!("Server stopped");
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => tracing::info!("Received Ctrl+C, initiating shutdown..."),
        Err(e) => {
            tracing::error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await
        }
    }
}
