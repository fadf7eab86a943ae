//! HTTP request handlers for the ingest API.

use axum::{
    Json,
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::{error, info, warn};

use super::AppState;
use crate::model::{ExtractError, ImageUpload, StorageError};
use crate::normalizer;
use crate::utils::truthy;

const DEFAULT_LIST_LIMIT: u32 = 50;

/// Errors a handler can surface, mapped onto HTTP statuses.
#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    NotFound,
    Upstream(String),
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        // 404 keeps the {"detail": ...} shape the companion UI expects
        let (status, body) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, json!({ "error": msg })),
            ApiError::NotFound => (StatusCode::NOT_FOUND, json!({ "detail": "Not found" })),
            ApiError::Upstream(msg) => (StatusCode::BAD_GATEWAY, json!({ "error": msg })),
            ApiError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, json!({ "error": msg })),
        };
        (status, Json(body)).into_response()
    }
}

impl From<StorageError> for ApiError {
    fn from(err: StorageError) -> Self {
        error!("Storage error: {err}");
        ApiError::Internal(err.to_string())
    }
}

impl From<ExtractError> for ApiError {
    fn from(err: ExtractError) -> Self {
        warn!("Extraction failed: {err}");
        ApiError::Upstream(err.to_string())
    }
}

/// Health check endpoint.
pub async fn health() -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}

/// Current configuration, file merged over defaults.
pub async fn get_config(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.config.load())
}

/// Merge-writes the provided fields and returns the persisted result.
pub async fn set_config(
    State(state): State<AppState>,
    Json(incoming): Json<Value>,
) -> Result<impl IntoResponse, ApiError> {
    let merged = state
        .config
        .merge(&incoming)
        .map_err(|e| ApiError::BadRequest(e.to_string()))?;
    Ok(Json(merged))
}

#[derive(Debug, Deserialize)]
pub struct ListParams {
    pub limit: Option<u32>,
}

/// Listing projection of recent ingests, newest first.
pub async fn list_ingests(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> Result<impl IntoResponse, ApiError> {
    let limit = params.limit.unwrap_or(DEFAULT_LIST_LIMIT);
    let ingests = state.storage.lock().await.list_ingests(limit)?;
    Ok(Json(ingests))
}

/// Full ingest record by id.
pub async fn get_ingest(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let record = state
        .storage
        .lock()
        .await
        .get_ingest(id)?
        .ok_or(ApiError::NotFound)?;
    Ok(Json(record))
}

pub async fn delete_ingest(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    if !state.storage.lock().await.delete_ingest(id)? {
        return Err(ApiError::NotFound);
    }
    Ok(Json(json!({ "deleted": true })))
}

/// Upload a scoreboard photo: extract, normalize, persist.
pub async fn upload_image(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, ApiError> {
    let mut upload: Option<ImageUpload> = None;
    let mut player_names_raw = String::new();
    let mut bust_raw = String::new();
    let mut meta_raw = String::new();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(format!("Multipart error: {e}")))?
    {
        let field_name = field.name().map(|n| n.to_string());
        match field_name.as_deref() {
            Some("image") => {
                let filename = field.file_name().map(|n| n.to_string());
                if matches!(filename.as_deref(), Some("")) {
                    return Err(ApiError::BadRequest("No image file selected".to_string()));
                }
                let mime = field
                    .content_type()
                    .map(|c| c.to_string())
                    .unwrap_or_else(|| "image/jpeg".to_string());
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| ApiError::BadRequest(format!("Read error: {e}")))?
                    .to_vec();
                upload = Some(ImageUpload {
                    bytes,
                    filename: filename.unwrap_or_else(|| "image.jpg".to_string()),
                    mime,
                });
            }
            Some("player_names") => {
                player_names_raw = field
                    .text()
                    .await
                    .map_err(|e| ApiError::BadRequest(format!("Read error: {e}")))?;
            }
            Some("bust") => {
                bust_raw = field
                    .text()
                    .await
                    .map_err(|e| ApiError::BadRequest(format!("Read error: {e}")))?;
            }
            Some("meta") => {
                meta_raw = field
                    .text()
                    .await
                    .map_err(|e| ApiError::BadRequest(format!("Read error: {e}")))?;
            }
            _ => {} // ignore unknown fields
        }
    }

    let upload =
        upload.ok_or_else(|| ApiError::BadRequest("No image file provided".to_string()))?;
    let filename = upload.filename.clone();

    let players: Vec<String> = player_names_raw
        .split(',')
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(str::to_string)
        .collect();
    let bust = truthy(&bust_raw);
    // malformed metadata is dropped rather than failing the upload
    let meta: Value = serde_json::from_str(&meta_raw).unwrap_or_else(|_| json!({}));

    let config = state.config.resolved();
    let raw = state.extractor.extract(&config, upload).await?;

    let normalized = normalizer::normalize(&raw, &players, bust, meta.clone());
    let normalized = serde_json::to_value(&normalized)
        .map_err(|e| ApiError::Internal(format!("Normalization serialization failed: {e}")))?;

    let id = state.storage.lock().await.insert_ingest(
        &filename,
        &players,
        bust,
        &meta,
        &raw,
        &normalized,
    )?;
    info!("Ingest #{id} stored for {filename} ({} players)", players.len().max(1));

    Ok(Json(json!({
        "id": id,
        "filename": filename,
        "raw": raw,
        "normalized": normalized,
    })))
}
