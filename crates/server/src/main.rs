//! SiteKit server entry point.
//!
//! Loads settings, opens and migrates the database, serves the site and
//! stops on SIGINT/SIGTERM.

mod signals;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use sitekit_core::config::AppConfig;
use sitekit_core::db::Database;
use sitekit_web::WebServer;

// ---------------------------------------------------------------------------
// CLI arguments
// ---------------------------------------------------------------------------

/// SiteKit HTTP server.
#[derive(Parser, Debug)]
#[command(
    name = "sitekit-server",
    version,
    about = "Serve a SiteKit site: admin API, locale routing and API docs"
)]
struct Args {
    /// Path to the TOML configuration file.
    #[arg(short, long)]
    config: PathBuf,

    /// Override the log level from the config file (trace, debug, info, warn, error).
    #[arg(long)]
    log_level: Option<String>,
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Load and resolve configuration
    let mut config =
        AppConfig::load_from_file(&args.config).context("failed to load configuration file")?;
    config
        .resolve_env_vars()
        .context("failed to resolve environment variables in config")?;
    config
        .validate()
        .context("configuration validation failed")?;

    // Initialize tracing
    let log_level = args
        .log_level
        .clone()
        .unwrap_or_else(|| config.server.log_level.clone());

    let filter = EnvFilter::try_new(&log_level).unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .init();

    let languages: Vec<&str> = config.i18n.languages.iter().map(|l| l.code.as_str()).collect();

    // Startup banner
    info!("========================================");
    info!("  SiteKit Server v{}", env!("CARGO_PKG_VERSION"));
    info!("========================================");
    info!("Config file   : {}", args.config.display());
    info!("Listen        : {}", config.server.listen);
    info!("Debug         : {}", config.server.debug);
    info!("Languages     : {} (default {})", languages.join(", "), config.i18n.default_language);
    info!("Time zone     : {}", config.i18n.time_zone);
    info!("Data dir      : {}", config.server.data_dir.display());
    info!("Log level     : {}", log_level);
    info!("========================================");

    if config.server.debug {
        warn!("debug mode is on: static and media files are served by this process");
    }

    // Ensure data directory exists
    std::fs::create_dir_all(&config.server.data_dir).context("failed to create data directory")?;

    // Initialize database
    let db_path = config.database_path();
    let db = Database::open(&db_path).context("failed to open database")?;
    info!("Database initialized at {}", db_path.display());

    let listen_addr = config.server.listen.clone();
    let web_server =
        WebServer::new(config, db).context("failed to initialize the web server")?;

    // Start web server in background
    let web_handle = tokio::spawn(async move {
        if let Err(e) = web_server.start(&listen_addr).await {
            error!("Web server error: {}", e);
        }
    });

    // Wait for shutdown signal
    signals::wait_for_shutdown().await;

    info!("Shutdown signal received, stopping...");

    web_handle.abort();
    match web_handle.await {
        Err(e) if e.is_panic() => warn!("web server task panicked: {}", e),
        _ => {}
    }

    info!("SiteKit server stopped.");
    Ok(())
}
