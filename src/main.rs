use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tracing::info;

use filedrop::cache::CacheLayer;
use filedrop::config::StorageConfig;
use filedrop::db::Database;
use filedrop::reclaim::start_reclamation_worker;
use filedrop::service::FileService;
use filedrop::web::{AppState, WebServer};
use filedrop::Config;

#[tokio::main]
async fn main() -> std::io::Result<()> {
    // Load configuration
    let config = match Config::load("config.toml") {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load config.toml: {e}");
            eprintln!("Using default configuration.");
            Config::default()
        }
    };

    // Initialize logging
    if let Err(e) = filedrop::logging::init(&config.logging) {
        eprintln!("Failed to initialize logging: {e}");
        // Fall back to console-only logging
        filedrop::logging::init_console_only(&config.logging.level);
    }

    info!("filedrop - file sharing service");

    let db = match Database::connect(&config.database.path).await {
        Ok(db) => Arc::new(db),
        Err(e) => {
            eprintln!("Failed to open database {}: {e}", config.database.path);
            std::process::exit(1);
        }
    };

    let storage = match filedrop::storage::from_config(&config.storage, &config.server.base_url)
        .await
    {
        Ok(storage) => storage,
        Err(e) => {
            eprintln!("Failed to initialize storage backend: {e}");
            std::process::exit(1);
        }
    };
    info!(backend = storage.kind(), "storage backend initialized");

    // A missing or unreachable Redis degrades to the in-process cache only;
    // the connection check retries with bounded backoff before giving up.
    let redis_client = match config.cache.redis_url.as_deref() {
        Some(url) => filedrop::cache::connect_redis(url).await,
        None => None,
    };
    if redis_client.is_some() {
        info!("Redis listing cache enabled");
    }
    let cache = CacheLayer::new(redis_client);

    let service = FileService::new(
        db.clone(),
        storage.clone(),
        cache,
        &config.server.base_url,
        Duration::from_secs(config.cache.listing_ttl_secs),
    );

    start_reclamation_worker(db.clone(), storage, config.reclaim.interval_secs);
    info!(
        "Reclamation worker started (sweep every {} seconds)",
        config.reclaim.interval_secs
    );

    let uploads_dir = match &config.storage {
        StorageConfig::Local { root_dir } => Some(PathBuf::from(root_dir)),
        _ => None,
    };

    let app_state = AppState::new(
        db,
        service,
        &config.auth.jwt_secret,
        config.auth.access_token_expiry_secs,
    );

    let server = match WebServer::new(
        &config.server.host,
        config.server.port,
        app_state,
        &config.auth.jwt_secret,
        uploads_dir,
    ) {
        Ok(server) => server,
        Err(e) => {
            eprintln!("Failed to configure web server: {e}");
            std::process::exit(1);
        }
    };

    server.run().await
}
