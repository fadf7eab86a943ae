//! Router configuration for the ingest API.

use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{get, post},
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use super::AppState;
use super::handlers;

/// Uploads are scoreboard photos; 20 MiB is plenty.
const MAX_UPLOAD_BYTES: usize = 20 * 1024 * 1024;

/// Create the main router with all routes.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .route(
            "/config",
            get(handlers::get_config).post(handlers::set_config),
        )
        .route("/upload", post(handlers::upload_image))
        .route("/ingests", get(handlers::list_ingests))
        .route(
            "/ingests/:id",
            get(handlers::get_ingest).delete(handlers::delete_ingest),
        )
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
