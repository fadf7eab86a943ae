use std::sync::Arc;

use tokio::net::TcpListener;
use tokio::sync::Mutex;
use tracing::{error, info};

use dart_ingest::config::ConfigStore;
use dart_ingest::extractor::{Extractor, ParseExtractClient};
use dart_ingest::server::{AppState, routes::create_router};
use dart_ingest::storage::SqliteStorage;

#[tokio::main]
async fn main() {
    // Initialize logging
    tracing_subscriber::fmt::init();

    // Set panic hook to log details about any panic
    std::panic::set_hook(Box::new(|panic_info| {
        eprintln!("😱 Panic occurred: {:?}", panic_info);
    }));

    let config_path =
        std::env::var("INGEST_CONFIG").unwrap_or_else(|_| "config.json".to_string());
    let db_path = std::env::var("INGEST_DB").unwrap_or_else(|_| "data.db".to_string());
    let addr = std::env::var("INGEST_ADDR").unwrap_or_else(|_| "0.0.0.0:5000".to_string());

    let config = Arc::new(ConfigStore::new(config_path));

    // Initialize storage (SQLite) with async access (wrapped in a Mutex)
    let storage = match SqliteStorage::new(&db_path) {
        Ok(s) => Arc::new(Mutex::new(s)),
        Err(e) => {
            error!("Failed to initialize storage: {:?}", e);
            return;
        }
    };

    let extractor: Arc<dyn Extractor> = Arc::new(ParseExtractClient::new());

    let app = create_router(AppState {
        storage,
        extractor,
        config,
    });

    let listener = match TcpListener::bind(&addr).await {
        Ok(l) => l,
        Err(e) => {
            error!("Failed to bind {}: {}", addr, e);
            return;
        }
    };

    info!("🚀 dart-ingest listening on {}", addr);
    if let Err(e) = axum::serve(listener, app).await {
        error!("Server error: {}", e);
    }
}
