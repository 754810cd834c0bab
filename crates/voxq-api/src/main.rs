//! voxqueue HTTP server.
//!
//! Reads configuration from the environment (and `.env`), starts the
//! scheduled trigger and serves the manual-action API until Ctrl-C.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use voxq_core::defaults::SERVER_PORT;
use voxq_core::JobStore;
use voxq_db::{MemoryJobStore, PgJobStore, PoolConfig};
use voxq_jobs::{QueueConfig, QueueRunner, RetentionSweeper, Trigger};
use voxq_synthesis::GoogleTtsClient;

use voxq_api::{router, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Initialize tracing with configurable output
    //
    // Environment variables:
    //   LOG_FORMAT  - "json" or "text" (default: "text")
    //   LOG_FILE    - path to log file (optional, enables file logging)
    //   LOG_ANSI    - "true"/"false" override ANSI colors (auto-detected by default)
    //   RUST_LOG    - standard env filter (default: "voxq_api=debug,voxq_jobs=debug")
    let log_format = std::env::var("LOG_FORMAT").unwrap_or_else(|_| "text".to_string());
    let log_file = std::env::var("LOG_FILE").ok();
    let log_ansi = std::env::var("LOG_ANSI")
        .ok()
        .map(|v| v == "true" || v == "1");

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "voxq_api=debug,voxq_jobs=debug,tower_http=debug".into());

    let registry = tracing_subscriber::registry().with(env_filter);

    let _file_guard = if let Some(ref path) = log_file {
        let path = std::path::Path::new(path);
        let file_dir = path.parent().unwrap_or(std::path::Path::new("."));
        let file_name = path
            .file_name()
            .and_then(|f| f.to_str())
            .unwrap_or("voxq-api.log");
        let file_appender = tracing_appender::rolling::daily(file_dir, file_name);
        let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

        if log_format == "json" {
            registry
                .with(
                    tracing_subscriber::fmt::layer()
                        .json()
                        .with_writer(non_blocking),
                )
                .init();
        } else {
            // no ANSI in files unless asked for
            let layer = tracing_subscriber::fmt::layer()
                .with_writer(non_blocking)
                .with_ansi(log_ansi.unwrap_or(false));
            registry.with(layer).init();
        }
        Some(guard)
    } else {
        if log_format == "json" {
            registry
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        } else {
            let mut layer = tracing_subscriber::fmt::layer();
            if let Some(ansi) = log_ansi {
                layer = layer.with_ansi(ansi);
            }
            registry.with(layer).init();
        }
        None
    };

    info!(
        log_format = %log_format,
        log_file = log_file.as_deref().unwrap_or("(stdout)"),
        "Logging initialized"
    );

    let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
    let port: u16 = std::env::var("PORT")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(SERVER_PORT);

    let config = QueueConfig::from_env();
    info!(
        interval_secs = config.interval_seconds,
        parallel_calls = config.parallel_calls,
        retention = %config.retention_policy().describe(),
        "Queue configuration loaded"
    );

    let store = open_store().await?;
    let client = Arc::new(GoogleTtsClient::from_env()?);

    let runner = QueueRunner::new(store.clone(), client)
        .with_synthesis_timeout(config.synthesis_timeout());
    let sweeper = RetentionSweeper::new(store, config.retention_policy());
    let trigger = Trigger::new(runner, sweeper, &config);

    let app = router(AppState::new(trigger.clone()));
    let handle = trigger.start();

    let addr: SocketAddr = format!("{}:{}", host, port)
        .parse()
        .with_context(|| format!("invalid bind address {host}:{port}"))?;
    info!("Starting server on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    handle.shutdown().await?;
    info!("Server stopped");
    Ok(())
}

/// Select the job store from `QUEUE_STORE` (`memory` or `postgres`).
async fn open_store() -> anyhow::Result<Arc<dyn JobStore>> {
    let kind = std::env::var("QUEUE_STORE").unwrap_or_else(|_| "memory".to_string());
    match kind.as_str() {
        "memory" => {
            info!(subsystem = "db", component = "memory", "Using in-memory job store");
            Ok(Arc::new(MemoryJobStore::new()))
        }
        "postgres" => {
            let database_url = std::env::var("DATABASE_URL")
                .unwrap_or_else(|_| "postgres://localhost/voxqueue".to_string());
            let store = PgJobStore::connect(&database_url, PoolConfig::from_env())
                .await
                .context("failed to open PostgreSQL job store")?;
            Ok(Arc::new(store))
        }
        other => anyhow::bail!("unknown QUEUE_STORE '{other}', expected memory|postgres"),
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        return;
    }
    info!("Shutdown signal received");
}
