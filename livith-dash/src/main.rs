//! livith-dash - Livith content dashboard service
//!
//! Serves the admin JSON API over the Livith SQLite catalog. Configuration
//! resolves CLI > environment > TOML file > defaults.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use livith_common::config::{CliOverrides, DashConfig};
use livith_dash::draft::FileDraftStore;
use livith_dash::{build_router, AppState};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "livith-dash", version, about = "Livith content dashboard")]
struct Args {
    /// Config file (default: ~/.config/livith/config.toml or /etc/livith/config.toml)
    #[arg(long, env = "LIVITH_CONFIG")]
    config: Option<PathBuf>,

    /// Data directory holding the database and the draft file
    #[arg(long, env = "LIVITH_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// Database file (default: <data-dir>/livith.db)
    #[arg(long, env = "LIVITH_DATABASE")]
    database: Option<PathBuf>,

    /// Listen address (default: 127.0.0.1:5730)
    #[arg(long, env = "LIVITH_BIND")]
    bind: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let config = DashConfig::resolve(&CliOverrides {
        config: args.config,
        data_dir: args.data_dir,
        database: args.database,
        bind: args.bind,
    })?;

    // RUST_LOG wins over the configured level
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.log_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    info!("Starting Livith dashboard (livith-dash) v{}", env!("CARGO_PKG_VERSION"));
    info!("Database path: {}", config.database_path.display());
    info!("Draft file: {}", config.draft_path.display());
    if config.admin_password.is_none() {
        warn!("ADMIN_PASSWORD is not set; every login attempt will fail");
    }

    let pool = match livith_common::db::init_database(&config.database_path).await {
        Ok(pool) => {
            info!("✓ Database ready");
            pool
        }
        Err(e) => {
            error!("Failed to open database: {}", e);
            return Err(e.into());
        }
    };

    let drafts = Arc::new(FileDraftStore::new(config.draft_path.clone()));
    let state = AppState::new(pool, drafts, config.admin_password.clone());
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    info!("livith-dash listening on http://{}", config.bind_addr);
    info!("Health check: http://{}/health", config.bind_addr);

    axum::serve(listener, app).await?;

    Ok(())
}
