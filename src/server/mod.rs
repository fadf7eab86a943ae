pub mod handlers;
pub mod routes;

use std::sync::Arc;

use tokio::sync::Mutex;

use crate::config::ConfigStore;
use crate::extractor::Extractor;
use crate::storage::SqliteStorage;

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub storage: Arc<Mutex<SqliteStorage>>,
    pub extractor: Arc<dyn Extractor>,
    pub config: Arc<ConfigStore>,
}
