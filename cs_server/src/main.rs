//! Convention table queue server.
//!
//! Serves queue ETAs and staff operations over HTTP, backed by PostgreSQL
//! or an in-memory store.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Error};
use conseater::db::{Database, MemoryRepository, PgSeatingRepository, SeatingRepository};
use conseater::seating::SeatingManager;
use cs_server::config::{ServerConfig, StorageBackend};
use cs_server::{api, logging, maintenance, metrics};
use pico_args::Arguments;
use tokio::sync::watch;
use tracing::{error, info, warn};

const HELP: &str = "\
Run the convention table queue server

USAGE:
  cs_server [OPTIONS]

OPTIONS:
  --bind       IP:PORT     Server socket bind address  [default: env SERVER_BIND or 127.0.0.1:5000]
  --db-url     URL         Database connection string  [default: env DATABASE_URL or postgres://postgres@localhost/conseater]

FLAGS:
  --memory                 Keep everything in memory (nothing survives a restart)
  -h, --help               Print help information

ENVIRONMENT:
  SERVER_BIND                  Server bind address (e.g., 0.0.0.0:8080)
  DATABASE_URL                 PostgreSQL connection string
  STORAGE_BACKEND              postgres | memory
  MAINTENANCE_INTERVAL_SECS    Orphan cleanup period [default: 10]
  METRICS_BIND                 Prometheus exporter address (disabled when unset)
  MAX_GROUP_SIZE               Largest party per request [default: 12]
  RUST_LOG                     Log filter [default: info,sqlx=warn,hyper=warn]
";

struct Args {
    bind: Option<SocketAddr>,
    database_url: Option<String>,
    memory: bool,
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    // Load .env file if it exists
    let _ = dotenvy::dotenv();

    let mut pargs = Arguments::from_env();

    // Help has a higher priority and should be handled separately.
    if pargs.contains(["-h", "--help"]) {
        print!("{HELP}");
        std::process::exit(0);
    }

    let args = Args {
        bind: pargs.opt_value_from_str("--bind")?,
        database_url: pargs.opt_value_from_str("--db-url")?,
        memory: pargs.contains("--memory"),
    };

    logging::init();

    let unused = pargs.finish();
    if !unused.is_empty() {
        warn!("Ignoring unknown arguments: {:?}", unused);
    }

    let config = ServerConfig::from_env(args.bind, args.database_url, args.memory)?;
    config.validate()?;

    if let Some(addr) = config.metrics_bind {
        metrics::init_metrics(addr).map_err(|e| anyhow::anyhow!(e))?;
        info!("Prometheus metrics exported on http://{}/metrics", addr);
    }

    let mut database = None;
    let repository: Arc<dyn SeatingRepository> = match config.storage {
        StorageBackend::Postgres => {
            info!("Connecting to database");
            let db = Database::new(&config.database)
                .await
                .context("Failed to connect to database")?;
            db.init_schema()
                .await
                .context("Failed to apply database schema")?;
            info!("Database connected successfully");

            let repository: Arc<dyn SeatingRepository> =
                Arc::new(PgSeatingRepository::new(db.pool().clone()));
            database = Some(db);
            repository
        }
        StorageBackend::Memory => {
            warn!("Using in-memory storage; queues are lost on restart");
            Arc::new(MemoryRepository::new())
        }
    };

    let manager = Arc::new(
        SeatingManager::new(repository).with_max_group_size(config.max_group_size),
    );
    manager
        .record_start()
        .await
        .context("Failed to record start event")?;

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let maintenance_task = tokio::spawn(maintenance::run(
        manager.clone(),
        config.maintenance_interval,
        shutdown_rx,
    ));

    let app = api::create_router(api::AppState { manager });

    info!("Starting HTTP server on {}", config.bind);
    let listener = tokio::net::TcpListener::bind(config.bind)
        .await
        .with_context(|| format!("Failed to bind to {}", config.bind))?;

    info!(
        "Server is running at http://{}. Press Ctrl+C to stop.",
        config.bind
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Shutting down server...");

    let _ = shutdown_tx.send(true);
    if let Err(e) = maintenance_task.await {
        error!("Maintenance task ended abnormally: {}", e);
    }

    if let Some(db) = database {
        db.close().await;
    }

    Ok(())
}

/// Graceful shutdown signal
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to install CTRL+C signal handler: {}", e);
        std::future::pending::<()>().await;
    }
}
