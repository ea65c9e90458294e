//! Feels Like API server binary.
//!
//! Reads configuration from the environment (and `.env`), connects to
//! PostgreSQL, runs migrations and serves the REST API until Ctrl-C.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use feelslike_api::AppState;
use feelslike_api::config::ApiConfig;
use feelslike_core::auth::federated::GoogleIdentityVerifier;
use feelslike_core::media::DiskMediaStore;
use feelslike_core::store::{MemoryStore, PgStore, Store};
use tracing::{info, warn};

const DEFAULT_LOG_FILTER: &str = "info,feelslike_api=debug,feelslike_core=debug";

/// CLI arguments for the API server.
#[derive(Parser, Debug)]
#[command(name = "feelslike_api_server", about = "Feels Like API server")]
struct Args {
    /// Address to listen on.
    #[arg(long, env = "BIND_ADDR", default_value = "127.0.0.1:3000")]
    bind_addr: String,

    /// PostgreSQL connection URL.
    #[arg(
        long,
        env = "DATABASE_URL",
        default_value = "postgres://localhost:5432/feelslike"
    )]
    database_url: String,

    /// Maximum number of database connections in the pool.
    #[arg(long, default_value_t = 5)]
    max_connections: u32,

    /// Directory for uploaded avatars and post images.
    #[arg(long, env = "UPLOADS_DIR")]
    uploads_dir: Option<PathBuf>,

    /// Keep everything in memory instead of PostgreSQL. Data is lost on exit.
    #[arg(long, default_value_t = false)]
    memory: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(DEFAULT_LOG_FILTER)),
        )
        .init();

    let args = Args::parse();

    let mut config = ApiConfig::from_env()?;
    config.bind_addr = args.bind_addr;
    config.pg_connection_url = args.database_url;
    if let Some(dir) = args.uploads_dir {
        config.uploads_dir = dir;
    }

    info!(
        bind_addr = %config.bind_addr,
        uploads_dir = %config.uploads_dir.display(),
        memory = args.memory,
        "starting feelslike_api_server"
    );

    let store: Arc<dyn Store> = if args.memory {
        warn!("using in-memory store; all data is lost on exit");
        Arc::new(MemoryStore::new())
    } else {
        info!(
            max_connections = args.max_connections,
            "configuring connection pool"
        );
        let pg = PgStore::connect(&config.pg_connection_url, args.max_connections).await?;
        pg.migrate().await?;
        Arc::new(pg)
    };

    if config.google_client_id.is_empty() {
        warn!("GOOGLE_CLIENT_ID not set; federated login will reject every credential");
    }

    let http = reqwest::Client::builder()
        .timeout(Duration::from_secs(10))
        .build()?;
    let media = Arc::new(DiskMediaStore::new(config.uploads_dir.clone(), http.clone()));
    let identity = Arc::new(GoogleIdentityVerifier::new(http));

    let state = AppState::new(config.clone(), store, media, identity)?;
    let app = feelslike_api::router(state);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    info!(addr = %listener.local_addr()?, "REST API listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "failed to listen for ctrl-c");
        std::future::pending::<()>().await;
    }
    info!("shutdown signal received");
}
